//! Content repository: the moderated item catalog.

use crate::auth::SessionController;
use crate::error::{StoreError, StoreResult};
use crate::model::{new_id, Item};
use crate::security::sanitize::{char_len, sanitize};
use crate::store::Store;
use std::sync::Arc;

/// Minimum title/category length after sanitization.
const MIN_LABEL: usize = 3;

/// Minimum description length after sanitization.
const MIN_DESCRIPTION: usize = 10;

/// Starter catalog used when seeding and on reset.
const DEFAULT_ITEMS: [(&str, &str, &str); 3] = [
    ("Intro to Vue 3", "Course", "Composition API basics"),
    ("Modern CSS Layouts", "Workshop", "Grid & Flexbox"),
    ("Secure Frontend Basics", "Seminar", "XSS & sanitization"),
];

/// Owner of the item collection. Mutations require an admin session.
pub struct ContentRepository {
    store: Arc<Store>,
    sessions: SessionController,
}

impl ContentRepository {
    pub fn new(store: Arc<Store>, sessions: SessionController) -> Self {
        Self { store, sessions }
    }

    /// All items, most recent first.
    pub fn list_items(&self) -> Vec<Item> {
        self.store.read(|s| s.items.clone())
    }

    pub fn get_item(&self, id: &str) -> Option<Item> {
        self.store
            .read(|s| s.items.iter().find(|i| i.id == id).cloned())
    }

    /// Add an item at the front of the catalog.
    pub fn add_item(&self, title: &str, category: &str, description: &str) -> StoreResult<Item> {
        let admin = self.sessions.require_admin()?;

        let title = sanitize(title);
        let category = sanitize(category);
        let description = sanitize(description);
        if char_len(&title) < MIN_LABEL {
            return Err(StoreError::validation(format!(
                "title must be at least {MIN_LABEL} characters"
            )));
        }
        if char_len(&category) < MIN_LABEL {
            return Err(StoreError::validation(format!(
                "category must be at least {MIN_LABEL} characters"
            )));
        }
        if char_len(&description) < MIN_DESCRIPTION {
            return Err(StoreError::validation(format!(
                "description must be at least {MIN_DESCRIPTION} characters"
            )));
        }

        let item = Item {
            id: new_id(),
            title,
            category,
            description,
            reviews: Vec::new(),
        };
        self.store.commit(|s| {
            s.items.insert(0, item.clone());
            Ok(())
        })?;

        tracing::info!(item_id = %item.id, by = %admin.id, "Added item");
        Ok(item)
    }

    /// Remove an item and its reviews. Returns `false` (and writes nothing)
    /// when no item has this id.
    pub fn remove_item(&self, id: &str) -> StoreResult<bool> {
        let admin = self.sessions.require_admin()?;

        let removed = self.store.commit(|s| {
            let before = s.items.len();
            s.items.retain(|i| i.id != id);
            Ok(s.items.len() != before)
        })?;

        if removed {
            tracing::info!(item_id = id, by = %admin.id, "Removed item");
        } else {
            tracing::debug!(item_id = id, "Remove ignored, no such item");
        }
        Ok(removed)
    }

    /// Replace the catalog with the starter items, dropping every review.
    pub fn reset_items(&self) -> StoreResult<Vec<Item>> {
        let admin = self.sessions.require_admin()?;
        let items = default_items();
        self.store.commit(|s| {
            s.items = items.clone();
            Ok(())
        })?;
        tracing::info!(by = %admin.id, count = items.len(), "Reset catalog");
        Ok(items)
    }

    /// Seed the starter items if the catalog is empty. Returns whether it did.
    pub fn seed_if_empty(&self) -> StoreResult<bool> {
        let seeded = self.store.commit(|s| {
            if !s.items.is_empty() {
                return Ok(false);
            }
            s.items = default_items();
            Ok(true)
        })?;
        if seeded {
            tracing::info!(count = DEFAULT_ITEMS.len(), "Seeded starter catalog");
        }
        Ok(seeded)
    }
}

/// Fresh copies of the starter items.
pub fn default_items() -> Vec<Item> {
    DEFAULT_ITEMS
        .iter()
        .map(|(title, category, description)| Item {
            id: new_id(),
            title: sanitize(title),
            category: (*category).to_string(),
            description: sanitize(description),
            reviews: Vec::new(),
        })
        .collect()
}
