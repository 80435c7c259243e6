pub mod prepare_media;
pub mod publish_destination;
pub mod refresh_credential;
pub mod sync_source;
