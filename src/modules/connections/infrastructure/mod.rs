pub mod memory;
pub mod models;
pub mod repository;

pub use memory::MemoryConnectionRepository;
pub use repository::ConnectionRepositoryImpl;
