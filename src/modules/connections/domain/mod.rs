pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{Connection, ConnectionStatus, NewConnection, Platform};
pub use repository::ConnectionRepository;
