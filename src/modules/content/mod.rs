pub mod client;
pub mod domain;
pub mod infrastructure;
pub mod memory;
pub mod tiktok;

pub use client::{ContentSourceClient, ItemPage, SourceItem};
pub use domain::{InsertOutcome, NewSourceItem, SourceItemRecord, SourceItemRepository};
pub use infrastructure::SourceItemRepositoryImpl;
pub use memory::MemorySourceItemRepository;
pub use tiktok::TikTokContentClient;
