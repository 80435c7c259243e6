pub mod context;
pub mod handlers;
pub mod sweeps;
pub mod worker;

pub use context::PipelineContext;
pub use sweeps::SweepScheduler;
pub use worker::PipelineWorker;
