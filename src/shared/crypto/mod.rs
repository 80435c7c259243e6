mod vault;

pub use vault::CredentialVault;
