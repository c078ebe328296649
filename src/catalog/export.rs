//! CSV export of the catalog and its reviews.

use crate::catalog::reviews::average_rating;
use crate::model::Item;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Catalog as CSV, one row per item.
pub fn items_csv(items: &[Item]) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["ID", "Title", "Category", "Description", "Reviews", "Average Rating"])?;
    for item in items {
        let count = item.reviews.len().to_string();
        let avg = format!("{:.2}", average_rating(item));
        w.write_record([
            item.id.as_str(),
            item.title.as_str(),
            item.category.as_str(),
            item.description.as_str(),
            count.as_str(),
            avg.as_str(),
        ])?;
    }
    finish(w)
}

/// Every review as CSV, grouped by item in catalog order.
pub fn reviews_csv(items: &[Item]) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["Item", "Rating", "Comment", "By", "Created At"])?;
    for item in items {
        for review in &item.reviews {
            let rating = review.rating.to_string();
            let created_at = review.created_at.to_rfc3339();
            w.write_record([
                item.title.as_str(),
                rating.as_str(),
                review.comment.as_str(),
                review.by_name.as_str(),
                created_at.as_str(),
            ])?;
        }
    }
    finish(w)
}

/// `<base>-YYYY-MM-DD-HH-MM-SS.csv`
pub fn export_file_name(base: &str, at: DateTime<Utc>) -> String {
    format!("{base}-{}.csv", at.format("%Y-%m-%d-%H-%M-%S"))
}

fn finish(w: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = w.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Review;
    use chrono::TimeZone;

    fn item_with_reviews() -> Item {
        let at = Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap();
        Item {
            id: "i1".into(),
            title: "Welcome Fair".into(),
            category: "Festival".into(),
            description: "Food, music, and \"fun\"".into(),
            reviews: vec![
                Review {
                    id: "r1".into(),
                    item_id: "i1".into(),
                    rating: 4,
                    comment: "Loved it\nwould return".into(),
                    by_id: "u1".into(),
                    by_name: "Ann".into(),
                    created_at: at,
                },
                Review {
                    id: "r2".into(),
                    item_id: "i1".into(),
                    rating: 5,
                    comment: "Great".into(),
                    by_id: "u2".into(),
                    by_name: "Bob".into(),
                    created_at: at,
                },
            ],
        }
    }

    #[test]
    fn items_csv_quotes_special_fields() {
        let csv = items_csv(&[item_with_reviews()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID,Title,Category,Description,Reviews,Average Rating"
        );
        assert_eq!(
            lines.next().unwrap(),
            r#"i1,Welcome Fair,Festival,"Food, music, and ""fun""",2,4.50"#
        );
    }

    #[test]
    fn reviews_csv_has_row_per_review() {
        let csv = reviews_csv(&[item_with_reviews()]).unwrap();
        assert!(csv.starts_with("Item,Rating,Comment,By,Created At\n"));
        assert!(csv.contains("\"Loved it\nwould return\""));
        assert!(csv.contains("Welcome Fair,5,Great,Bob,2025-03-02T10:00:00+00:00"));
    }

    #[test]
    fn empty_catalog_is_header_only() {
        assert_eq!(items_csv(&[]).unwrap().lines().count(), 1);
    }

    #[test]
    fn file_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2025, 3, 2, 10, 5, 9).unwrap();
        assert_eq!(export_file_name("items", at), "items-2025-03-02-10-05-09.csv");
    }
}
