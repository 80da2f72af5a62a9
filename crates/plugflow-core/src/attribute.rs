//! Attribute descriptors: the type and storage policy of a plug.
//!
//! Two ratings are defined on attributes, both on a 0..=255 scale where 0
//! means "does not fit" and 255 means "exact class match":
//!
//! - [`Attribute::compatibility_rating`] rates a concrete value against the
//!   slot (used by `set` and by cache validation).
//! - [`Attribute::connection_affinity`] rates one slot against another (used
//!   by `connect` and to rank candidate plugs when auto-wiring).
//!
//! Intermediate ratings express how far below the declared class the
//! candidate class sits: with resolution chain `[c, p1, .., any]` of length
//! `n` and the declared class at position `k`, the rating is
//! `(n - k) * 255 / n`.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::type_id::{TypeId, TypeRegistry};
use crate::types::TypeSpec;
use crate::value::Value;

/// Rating of an exact class match.
pub const EXACT_MATCH: u8 = 255;

/// Bitset of attribute policy flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttrFlags(u8);

impl AttrFlags {
    pub const NONE: AttrFlags = AttrFlags(0);
    /// Only the declared class itself fits, subclasses are rejected.
    pub const EXACT_TYPE: AttrFlags = AttrFlags(1 << 0);
    /// The plug accepts `set`.
    pub const WRITABLE: AttrFlags = AttrFlags(1 << 1);
    /// The plug is computed even without internal `affected_by` edges.
    pub const COMPUTABLE: AttrFlags = AttrFlags(1 << 2);
    /// The slot stores a class, not an instance.
    pub const CLASS_VALUED: AttrFlags = AttrFlags(1 << 3);
    /// Computed values are never cached.
    pub const UNCACHED: AttrFlags = AttrFlags(1 << 4);
    /// The plug refuses to be a connection destination.
    pub const UNCONNECTABLE: AttrFlags = AttrFlags(1 << 5);
    /// The cache keeps a non-owning handle to object values.
    pub const WEAK_CACHE: AttrFlags = AttrFlags(1 << 6);

    const NAMES: [(AttrFlags, &'static str); 7] = [
        (Self::EXACT_TYPE, "exact_type"),
        (Self::WRITABLE, "writable"),
        (Self::COMPUTABLE, "computable"),
        (Self::CLASS_VALUED, "class_valued"),
        (Self::UNCACHED, "uncached"),
        (Self::UNCONNECTABLE, "unconnectable"),
        (Self::WEAK_CACHE, "weak_cache"),
    ];

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: AttrFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: AttrFlags) -> AttrFlags {
        AttrFlags(self.0 | other.0)
    }

    pub fn insert(&mut self, other: AttrFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: AttrFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for AttrFlags {
    type Output = AttrFlags;

    fn bitor(self, rhs: AttrFlags) -> AttrFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for AttrFlags {
    fn bitor_assign(&mut self, rhs: AttrFlags) {
        self.insert(rhs);
    }
}

impl fmt::Display for AttrFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Immutable type/policy descriptor of a plug slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    type_spec: TypeSpec,
    flags: AttrFlags,
    default: Option<Value>,
}

impl Attribute {
    /// Creates an attribute of the given type with no flags and no default.
    pub fn new(type_spec: impl Into<TypeSpec>) -> Self {
        Attribute {
            type_spec: type_spec.into(),
            flags: AttrFlags::NONE,
            default: None,
        }
    }

    pub fn with_flags(mut self, flags: AttrFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn writable(self) -> Self {
        self.with_flags(AttrFlags::WRITABLE)
    }

    pub fn computable(self) -> Self {
        self.with_flags(AttrFlags::COMPUTABLE)
    }

    pub fn exact(self) -> Self {
        self.with_flags(AttrFlags::EXACT_TYPE)
    }

    pub fn class_valued(self) -> Self {
        self.with_flags(AttrFlags::CLASS_VALUED)
    }

    pub fn uncached(self) -> Self {
        self.with_flags(AttrFlags::UNCACHED)
    }

    pub fn unconnectable(self) -> Self {
        self.with_flags(AttrFlags::UNCONNECTABLE)
    }

    pub fn weak_cache(self) -> Self {
        self.with_flags(AttrFlags::WEAK_CACHE)
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn type_spec(&self) -> &TypeSpec {
        &self.type_spec
    }

    pub fn flags(&self) -> AttrFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: AttrFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Value returned by an unconnected input without a cached value.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Toggles a flag in place. Only schemas under construction expose a
    /// mutable attribute.
    pub fn set_flag(&mut self, flag: AttrFlags, on: bool) {
        if on {
            self.flags.insert(flag);
        } else {
            self.flags.remove(flag);
        }
    }

    /// Rejects contradictory flag combinations.
    ///
    /// A writable but uncached attribute would lose every value written to it.
    pub fn validate(&self, plug: &str) -> Result<(), CoreError> {
        if self.has_flag(AttrFlags::WRITABLE) && self.has_flag(AttrFlags::UNCACHED) {
            return Err(CoreError::InvalidAttribute {
                plug: plug.to_string(),
                reason: "writable attributes must be cached".to_string(),
            });
        }
        Ok(())
    }

    /// Rates how well `value` fits this slot, 0 meaning incompatible.
    pub fn compatibility_rating(&self, value: &Value, registry: &TypeRegistry) -> u8 {
        let class_valued = self.has_flag(AttrFlags::CLASS_VALUED);
        let candidate = match (class_valued, value) {
            (true, Value::Type(ty)) => *ty,
            (true, _) => return 0,
            (false, v) => v.type_id(),
        };

        let rating = class_rating(
            registry,
            candidate,
            self.type_spec.base_type(),
            self.has_flag(AttrFlags::EXACT_TYPE),
        );
        if rating == 0 {
            return 0;
        }
        if !class_valued
            && self.type_spec.is_composite()
            && !self.type_spec.matches_shape(value, registry)
        {
            return 0;
        }
        rating
    }

    /// Rates how well this attribute, as a connection source, feeds `dest`.
    ///
    /// Zero if `dest` is unconnectable or the class-valued policies differ;
    /// otherwise the source's declared class is rated against the
    /// destination's declared class under the destination's exactness.
    pub fn connection_affinity(&self, dest: &Attribute, registry: &TypeRegistry) -> u8 {
        if dest.has_flag(AttrFlags::UNCONNECTABLE) {
            return 0;
        }
        if self.has_flag(AttrFlags::CLASS_VALUED) != dest.has_flag(AttrFlags::CLASS_VALUED) {
            return 0;
        }
        class_rating(
            registry,
            self.type_spec.base_type(),
            dest.type_spec.base_type(),
            dest.has_flag(AttrFlags::EXACT_TYPE),
        )
    }
}

/// Rates `candidate` against `declared` by position in the candidate's
/// resolution chain.
fn class_rating(registry: &TypeRegistry, candidate: TypeId, declared: TypeId, exact: bool) -> u8 {
    if exact {
        return if candidate == declared { EXACT_MATCH } else { 0 };
    }

    let chain = registry.ancestors(candidate);
    match chain.iter().position(|&ty| ty == declared) {
        None => 0,
        Some(depth) => {
            let len = chain.len();
            let rating = (len - depth) * usize::from(EXACT_MATCH) / len;
            // Very deep chains must not round a real match down to "incompatible".
            rating.max(1) as u8
        }
    }
}
