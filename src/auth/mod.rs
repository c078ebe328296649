//! Account authentication and the active session.
//!
//! Provides:
//! - Registration with email/password (salted digest, per-user salt)
//! - Login gated by the install-wide lockout monitor
//! - A single active session with role-based checks
//!
//! ## Design Decisions
//! - Sessions are local state, not tokens: exactly one identity is signed in
//!   per install, replaced on every login.
//! - Role is fixed at registration from `accounts.admin_emails`.

pub mod credentials;
pub mod session;

pub use credentials::CredentialManager;
pub use session::SessionController;
