//! Infrastructure layer: entity store, reception engine, PVZ directory,
//! accounts, config.

pub mod accounts;
pub mod config;
pub mod deadline;
pub mod directory;
pub mod engine;
pub mod error;
pub mod store;


pub use accounts::AccountService;
pub use deadline::Deadline;
pub use directory::PvzDirectory;
pub use engine::ReceptionEngine;
pub use error::{ErrorKind, ServiceError};
pub use store::{EntityStore, InMemoryEntityStore, PostgresEntityStore, StoreError, StoreTransaction};
