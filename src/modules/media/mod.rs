pub mod stager;
pub mod storage;

pub use stager::{MediaStager, StagedMedia};
pub use storage::{MemoryObjectStorage, ObjectStorage};
