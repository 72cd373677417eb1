//! Reception lifecycle domain module.
//!
//! Receptions are intake sessions at a PVZ; products are the items scanned
//! during one. This crate holds the state-transition rules as deterministic
//! domain logic (no IO, no HTTP, no storage). Enforcing them atomically
//! against shared state is the job of the store-backed engine in `pvz-infra`.

pub mod product;
pub mod reception;

pub use product::{Product, ProductType};
pub use reception::{Reception, ReceptionStatus, ensure_can_open};
