pub mod connections;
pub mod content;
pub mod jobs;
pub mod media;
pub mod pipeline;
pub mod publish;
pub mod queue;
pub mod rules;
