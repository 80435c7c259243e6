pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{PublishAttempt, PublishStatus};
pub use repository::PublishAttemptRepository;
