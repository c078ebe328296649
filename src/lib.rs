//! Local-first accounts, sessions and a reviewed event catalog.
//!
//! Everything lives in one [`store::Store`] persisted write-through to a
//! key-value backend (SQLite by default). [`App`] wires the components:
//!
//! - [`auth::CredentialManager`]: register / login with salted digests
//! - [`security::LockoutMonitor`]: cool-down after repeated login failures
//! - [`auth::SessionController`]: the single signed-in identity
//! - [`catalog::ContentRepository`]: admin-moderated items
//! - [`catalog::ReviewService`]: ratings and comments on items

pub mod app;
pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod security;
pub mod store;

pub use app::App;
pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use model::{Item, LockState, Review, Role, Session, User};
