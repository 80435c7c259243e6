pub mod memory;
pub mod repository;

pub use memory::MemoryPublishAttemptRepository;
pub use repository::PublishAttemptRepositoryImpl;
