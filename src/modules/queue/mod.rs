pub mod domain;
pub mod infrastructure;
pub mod memory;

pub use domain::{DispatchQueue, NackOutcome, QueueConfig, QueueDelivery};
pub use infrastructure::DieselDispatchQueue;
pub use memory::MemoryDispatchQueue;
