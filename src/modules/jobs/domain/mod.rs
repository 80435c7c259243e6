pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{JobKind, JobRecord, JobStatus, NewJob};
pub use repository::{JobStatistics, JobStore};
