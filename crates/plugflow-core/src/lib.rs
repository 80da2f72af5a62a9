pub mod attribute;
pub mod error;
pub mod id;
pub mod plug;
pub mod schema;
pub mod type_id;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use attribute::{AttrFlags, Attribute, EXACT_MATCH};
pub use error::CoreError;
pub use id::{NodeId, PlugId};
pub use plug::{Plug, PlugIds};
pub use schema::{NodeSchema, NodeSchemaBuilder, MAX_PLUGS};
pub use type_id::{ClassInfo, TypeId, TypeRegistry};
pub use types::TypeSpec;
pub use value::{Object, Value};
