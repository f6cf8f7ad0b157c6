//! Directory implementations for the collaborator traits.

mod memory;
mod sqlite;

pub use memory::MemoryDirectory;
pub use sqlite::SqliteDirectory;
