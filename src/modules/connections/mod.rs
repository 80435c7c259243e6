pub mod domain;
pub mod handshake;
pub mod infrastructure;
pub mod refresh;

pub use domain::{Connection, ConnectionRepository, ConnectionStatus, NewConnection, Platform};
pub use handshake::{HandshakeStore, PendingHandshake};
pub use infrastructure::{ConnectionRepositoryImpl, MemoryConnectionRepository};
pub use refresh::{OAuthTokenRefresher, RefreshedCredential, TokenRefresher};
