pub mod memory;
pub mod pool;
pub mod queries;
pub mod schema;
pub mod store;

pub use memory::MemoryStore;
pub use pool::create_pool;
pub use queries::PgRecordStore;
pub use schema::{ensure_indexes, ensure_schema, index_name};
pub use store::{InboxStore, RecordStore, ReminderStore};
