//! Review subsystem: submission, per-item aggregates, per-user listing.

use crate::auth::SessionController;
use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};
use crate::model::{new_id, Item, Review};
use crate::security::sanitize::{char_len, sanitize};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lowest accepted rating.
const MIN_RATING: i64 = 1;

/// Highest accepted rating.
const MAX_RATING: i64 = 5;

/// Comment length bounds (characters, after sanitization).
const MIN_COMMENT: usize = 5;
const MAX_COMMENT: usize = 250;

/// Aggregate over a set of ratings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingSummary {
    pub count: usize,
    /// 0 when there are no ratings.
    pub avg: f64,
    pub min: Option<u8>,
    pub max: Option<u8>,
    /// Number of ratings per star value, index 0..=5.
    pub buckets: [usize; 6],
}

/// Mean rating of an item; exactly 0 when it has no reviews.
pub fn average_rating(item: &Item) -> f64 {
    if item.reviews.is_empty() {
        return 0.0;
    }
    let sum: u32 = item.reviews.iter().map(|r| u32::from(r.rating)).sum();
    f64::from(sum) / item.reviews.len() as f64
}

/// Count, mean, extremes and per-star histogram of `ratings`.
pub fn summarize_ratings(ratings: &[u8]) -> RatingSummary {
    let mut buckets = [0usize; 6];
    for &r in ratings {
        buckets[usize::from(r.min(5))] += 1;
    }
    let sum: u32 = ratings.iter().map(|&r| u32::from(r)).sum();
    RatingSummary {
        count: ratings.len(),
        avg: if ratings.is_empty() {
            0.0
        } else {
            f64::from(sum) / ratings.len() as f64
        },
        min: ratings.iter().copied().min(),
        max: ratings.iter().copied().max(),
        buckets,
    }
}

/// Reviews nested under catalog items.
pub struct ReviewService {
    store: Arc<Store>,
    sessions: SessionController,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(store: Arc<Store>, sessions: SessionController, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sessions,
            clock,
        }
    }

    /// Append a review by the signed-in user to an item.
    ///
    /// Checked in order: signed in, item exists, rating in 1..=5, comment
    /// length in 5..=250 after sanitization.
    pub fn submit_review(&self, item_id: &str, rating: i64, comment: &str) -> StoreResult<Review> {
        let author = self.sessions.require()?;
        let comment = sanitize(comment);
        let created_at = self.clock.now();

        let review = self.store.commit(|s| {
            let item = s
                .items
                .iter_mut()
                .find(|i| i.id == item_id)
                .ok_or_else(|| StoreError::not_found(item_id))?;

            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(StoreError::validation(format!(
                    "rating must be a whole number from {MIN_RATING} to {MAX_RATING}"
                )));
            }
            let len = char_len(&comment);
            if !(MIN_COMMENT..=MAX_COMMENT).contains(&len) {
                return Err(StoreError::validation(format!(
                    "comment must be {MIN_COMMENT}-{MAX_COMMENT} characters"
                )));
            }

            let review = Review {
                id: new_id(),
                item_id: item.id.clone(),
                rating: u8::try_from(rating)
                    .map_err(|_| StoreError::validation("rating out of range"))?,
                comment: comment.clone(),
                by_id: author.id.clone(),
                by_name: author.display_name.clone(),
                created_at,
            };
            item.reviews.push(review.clone());
            Ok(review)
        })?;

        tracing::info!(
            review_id = %review.id,
            item_id = %review.item_id,
            rating = review.rating,
            by = %review.by_id,
            "Submitted review"
        );
        Ok(review)
    }

    /// Every review by the signed-in user, newest first. Empty when signed out.
    pub fn reviews_by_current_user(&self) -> Vec<Review> {
        let Some(session) = self.sessions.current() else {
            return Vec::new();
        };
        let mut reviews: Vec<Review> = self.store.read(|s| {
            s.items
                .iter()
                .flat_map(|i| i.reviews.iter())
                .filter(|r| r.by_id == session.id)
                .cloned()
                .collect()
        });
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews
    }

    /// Mean rating of the item with this id.
    pub fn average_for(&self, item_id: &str) -> StoreResult<f64> {
        self.store
            .read(|s| s.items.iter().find(|i| i.id == item_id).map(average_rating))
            .ok_or_else(|| StoreError::not_found(item_id))
    }

    /// Rating aggregate of the item with this id.
    pub fn rating_summary(&self, item_id: &str) -> StoreResult<RatingSummary> {
        self.store
            .read(|s| {
                s.items.iter().find(|i| i.id == item_id).map(|i| {
                    let ratings: Vec<u8> = i.reviews.iter().map(|r| r.rating).collect();
                    summarize_ratings(&ratings)
                })
            })
            .ok_or_else(|| StoreError::not_found(item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{Role, Session};
    use crate::store::kv::MemoryKv;
    use chrono::Duration;

    struct Fixture {
        store: Arc<Store>,
        clock: Arc<ManualClock>,
        reviews: ReviewService,
        item_id: String,
    }

    fn sign_in(store: &Store, id: &str, name: &str) {
        store
            .commit(|s| {
                s.session = Some(Session {
                    id: id.into(),
                    display_name: name.into(),
                    email: format!("{id}@x.com"),
                    role: Role::User,
                });
                Ok(())
            })
            .unwrap();
    }

    fn fixture() -> Fixture {
        let store = Arc::new(Store::open(Arc::new(MemoryKv::new())).unwrap());
        let item = Item {
            id: "item-1".into(),
            title: "Jazz Evening".into(),
            category: "Music".into(),
            description: "An evening of jazz".into(),
            reviews: Vec::new(),
        };
        store
            .commit(|s| {
                s.items.push(item.clone());
                Ok(())
            })
            .unwrap();
        let clock = Arc::new(ManualClock::default());
        let reviews = ReviewService::new(
            store.clone(),
            SessionController::new(store.clone()),
            clock.clone(),
        );
        Fixture {
            store,
            clock,
            reviews,
            item_id: item.id,
        }
    }

    fn item_reviews(f: &Fixture) -> Vec<Review> {
        f.store.read(|s| s.items[0].reviews.clone())
    }

    #[test]
    fn average_of_empty_is_zero() {
        let f = fixture();
        let item = f.store.read(|s| s.items[0].clone());
        assert_eq!(average_rating(&item), 0.0);
        assert_eq!(average_rating(&item), average_rating(&item));
        assert_eq!(f.reviews.average_for(&f.item_id).unwrap(), 0.0);
    }

    #[test]
    fn submit_and_average() {
        let f = fixture();
        sign_in(&f.store, "u1", "Ann");

        let r = f.reviews.submit_review(&f.item_id, 4, "Great night out").unwrap();
        assert_eq!(r.by_id, "u1");
        assert_eq!(r.by_name, "Ann");
        assert_eq!(r.item_id, f.item_id);
        assert_eq!(r.created_at, f.clock.now());

        f.reviews.submit_review(&f.item_id, 5, "Even better twice").unwrap();
        assert_eq!(item_reviews(&f).len(), 2);
        assert_eq!(f.reviews.average_for(&f.item_id).unwrap(), 4.5);
    }

    #[test]
    fn submit_requires_session() {
        let f = fixture();
        let err = f.reviews.submit_review(&f.item_id, 4, "Great night").unwrap_err();
        assert!(matches!(err, StoreError::Authentication));
        assert!(item_reviews(&f).is_empty());
    }

    #[test]
    fn submit_unknown_item() {
        let f = fixture();
        sign_in(&f.store, "u1", "Ann");
        let err = f.reviews.submit_review("missing", 4, "Great night").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn rating_out_of_range_rejected() {
        let f = fixture();
        sign_in(&f.store, "u1", "Ann");
        for rating in [0, 6, -1, 300] {
            let err = f.reviews.submit_review(&f.item_id, rating, "ok").unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
        assert!(item_reviews(&f).is_empty());
    }

    #[test]
    fn comment_length_bounds() {
        let f = fixture();
        sign_in(&f.store, "u1", "Ann");

        assert!(f.reviews.submit_review(&f.item_id, 3, "ok").is_err());
        assert!(f.reviews.submit_review(&f.item_id, 3, "<p>abc</p>").is_err());
        assert!(f.reviews.submit_review(&f.item_id, 3, &"x".repeat(251)).is_err());

        assert!(f.reviews.submit_review(&f.item_id, 3, "fine!").is_ok());
        assert!(f.reviews.submit_review(&f.item_id, 3, &"x".repeat(250)).is_ok());
        assert_eq!(item_reviews(&f).len(), 2);
    }

    #[test]
    fn same_user_may_review_repeatedly() {
        let f = fixture();
        sign_in(&f.store, "u1", "Ann");
        for _ in 0..3 {
            f.reviews.submit_review(&f.item_id, 2, "Again and again").unwrap();
        }
        assert_eq!(item_reviews(&f).len(), 3);
    }

    #[test]
    fn reviews_by_current_user_newest_first() {
        let f = fixture();
        assert!(f.reviews.reviews_by_current_user().is_empty());

        sign_in(&f.store, "u1", "Ann");
        let first = f.reviews.submit_review(&f.item_id, 3, "First visit").unwrap();
        f.clock.advance(Duration::minutes(5));

        sign_in(&f.store, "u2", "Bob");
        f.reviews.submit_review(&f.item_id, 1, "Not for me").unwrap();
        f.clock.advance(Duration::minutes(5));

        sign_in(&f.store, "u1", "Ann");
        let second = f.reviews.submit_review(&f.item_id, 5, "Second visit").unwrap();

        let mine = f.reviews.reviews_by_current_user();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id);
        assert_eq!(mine[1].id, first.id);
    }

    #[test]
    fn summarize_empty() {
        let s = summarize_ratings(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.avg, 0.0);
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
        assert_eq!(s.buckets, [0; 6]);
    }

    #[test]
    fn summarize_counts_buckets() {
        let s = summarize_ratings(&[5, 4, 5, 1]);
        assert_eq!(s.count, 4);
        assert_eq!(s.avg, 3.75);
        assert_eq!(s.min, Some(1));
        assert_eq!(s.max, Some(5));
        assert_eq!(s.buckets, [0, 1, 0, 0, 1, 2]);
    }

    #[test]
    fn rating_summary_for_item() {
        let f = fixture();
        sign_in(&f.store, "u1", "Ann");
        f.reviews.submit_review(&f.item_id, 2, "Could be better").unwrap();
        f.reviews.submit_review(&f.item_id, 4, "Pretty good show").unwrap();

        let s = f.reviews.rating_summary(&f.item_id).unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.avg, 3.0);
        assert!(matches!(
            f.reviews.rating_summary("missing"),
            Err(StoreError::NotFound { .. })
        ));
    }
}
