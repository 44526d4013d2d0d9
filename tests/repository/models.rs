//! Payload types used by the repository tests.

#![allow(dead_code)]

use optimistic_repository::{Collection, Patch};
use serde::{Deserialize, Serialize};

/// A flashcard deck.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Collection, Patch)]
pub struct Deck {
    pub name: String,
    pub description: String,
    pub card_count: u32,
}

impl Deck {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            card_count: 0,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// A to-do entry, stored with camelCase field names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Collection, Patch)]
#[collection(name = "todos")]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub title: String,
    pub is_done: bool,
    #[serde(skip)]
    #[patch(skip)]
    pub expanded: bool,
}

impl Todo {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            is_done: false,
            expanded: false,
        }
    }
}
