// Database and cache resources

pub mod pool;
pub mod redis;
pub mod schema;

pub use self::pool::DbPool;
pub use self::redis::CacheClient;
pub use self::schema::{SchemaMetadata, TableDefinition, TEMPLATE_SCHEMA};
