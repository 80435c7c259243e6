pub mod instagram;
pub mod youtube;

pub use instagram::InstagramPublisher;
pub use youtube::YouTubePublisher;
