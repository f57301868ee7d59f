//! Record store implementations and the startup normalization pass.

pub mod file;
pub mod memory;
pub mod migration;

pub use file::FileStore;
pub use memory::MemoryStore;
