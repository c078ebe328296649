//! Event catalog and reviews.
//!
//! ## Design
//! - Items are stored most-recent-first and own their reviews
//! - Only admins add, remove or reset items
//! - Any signed-in user may review any item, as often as they like

pub mod export;
pub mod items;
pub mod reviews;

pub use items::{default_items, ContentRepository};
pub use reviews::{average_rating, summarize_ratings, RatingSummary, ReviewService};
