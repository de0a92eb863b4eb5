mod dispatcher;
mod introspect;
mod manager;
mod types;

pub use dispatcher::QueryDispatcher;
pub use introspect::{SchemaIntrospector, default_fallback_columns};
pub use manager::DatabaseManager;
pub(crate) use manager::is_valid_identifier;
pub use types::{
    ColumnDescriptor, ExecutionReport, RowObject, SchemaDescription, SqlStore, StatementKind,
    TableDescriptor,
};
