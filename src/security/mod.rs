//! Security primitives: password digests, input sanitization, login lockout.

pub mod hashing;
pub mod lockout;
pub mod sanitize;

pub use hashing::{digest, HashScheme};
pub use lockout::LockoutMonitor;
pub use sanitize::sanitize;
