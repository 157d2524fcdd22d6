pub mod identifier;
pub mod introspect;
pub mod warehouse;

pub use identifier::{quote_identifier, resolve, TableRef};
pub use introspect::{ColumnDescriptor, SchemaIntrospector};
pub use warehouse::{render_markdown, value_text, BackendKind, ConnectionDescriptor, QueryResult, WarehouseClient};
