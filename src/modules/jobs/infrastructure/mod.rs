pub mod memory;
pub mod models;
pub mod repository;

pub use memory::MemoryJobStore;
pub use repository::JobStoreImpl;
