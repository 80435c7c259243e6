pub mod config;
pub mod crypto;
pub mod database;
pub mod errors;
pub mod utils;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use crypto::CredentialVault;
pub use database::{Database, DbConnection, DbPool};
