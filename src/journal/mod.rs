//! Discovery journal: photo notes pinned to where they were taken.
//!
//! Entries are kept newest first and persisted as one JSON array in the local
//! store. The descriptive text is produced elsewhere and arrives as a string.

use crate::geo::{Coordinate, ValidationError};
use crate::storage::{LocalStore, JOURNAL_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A saved journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    /// Captured image as a data URL
    pub image_data_url: String,
    /// Generated description of the image
    pub ai_description: String,
    pub user_notes: String,
    pub location: Coordinate,
}

/// Input for a new entry; id and date are assigned on save.
#[derive(Debug, Clone, Default)]
pub struct NewJournalEntry {
    pub image_data_url: Option<String>,
    pub ai_description: Option<String>,
    pub user_notes: String,
    pub location: Option<Coordinate>,
}

/// Journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Missing data to save the log entry: {0}")]
    MissingData(&'static str),

    #[error("Invalid entry location: {0}")]
    InvalidLocation(#[from] ValidationError),
}

/// Journal backed by a local store.
pub struct Journal {
    store: Arc<dyn LocalStore>,
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Load the journal. Unreadable or corrupt data is purged and treated as empty.
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let entries = match store.get(JOURNAL_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<JournalEntry>>(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Discarding corrupt discovery log: {}", e);
                    if let Err(e) = store.remove(JOURNAL_KEY) {
                        tracing::error!("Failed to purge discovery log: {}", e);
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Error loading discovery log: {}", e);
                Vec::new()
            }
        };

        Self { store, entries }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate, stamp and prepend a new entry, then persist the journal.
    pub fn add_entry(&mut self, entry: NewJournalEntry) -> Result<&JournalEntry, JournalError> {
        let image_data_url = entry
            .image_data_url
            .filter(|s| !s.is_empty())
            .ok_or(JournalError::MissingData("image"))?;
        let ai_description = entry
            .ai_description
            .filter(|s| !s.trim().is_empty())
            .ok_or(JournalError::MissingData("description"))?;
        let location = entry.location.ok_or(JournalError::MissingData("location"))?;
        location.validate()?;

        self.entries.insert(
            0,
            JournalEntry {
                id: Uuid::new_v4(),
                date: Utc::now(),
                image_data_url,
                ai_description,
                user_notes: entry.user_notes,
                location,
            },
        );
        self.save();

        Ok(&self.entries[0])
    }

    fn save(&self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Error serializing discovery log: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(JOURNAL_KEY, &json) {
            tracing::error!("Error saving discovery log: {}", e);
        }
    }
}
