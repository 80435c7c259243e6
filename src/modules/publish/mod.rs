pub mod domain;
pub mod infrastructure;
pub mod platforms;
pub mod publisher;

pub use domain::{PublishAttempt, PublishAttemptRepository, PublishStatus};
pub use infrastructure::{MemoryPublishAttemptRepository, PublishAttemptRepositoryImpl};
pub use platforms::{InstagramPublisher, YouTubePublisher};
pub use publisher::{PublishRequest, Publisher, PublisherRegistry};
