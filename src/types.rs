//! Core inventory types: items, drafts, quantity adjustments and theme preference

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::constants::limits;
use crate::error::ValidationError;

/// Opaque item identifier, assigned at creation and never reused
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized title used for collision detection (trimmed, case-folded)
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// A stored inventory item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub images: Vec<PathBuf>,
    pub quantity: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

impl Item {
    /// Build a new item with a fresh id from a draft
    pub fn from_draft(draft: ItemDraft) -> Self {
        Self {
            id: ItemId::generate(),
            title: draft.title,
            images: draft.images,
            quantity: draft.quantity,
            location: draft.location,
            description: draft.description,
        }
    }

    pub fn title_key(&self) -> String {
        title_key(&self.title)
    }

    /// Key used by merge-import: normalized title plus exact location
    pub fn merge_key(&self) -> (String, String) {
        (self.title_key(), self.location.clone())
    }

    /// Case-insensitive substring match over title, location and description
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.location.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// Form contents for creating or editing an item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub quantity: u32,
    pub location: String,
    pub description: String,
    pub images: Vec<PathBuf>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>, quantity: u32, location: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            quantity,
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_images(mut self, images: Vec<PathBuf>) -> Self {
        self.images = images;
        self
    }

    /// Draft pre-filled from an existing item (edit form)
    pub fn from_item(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            quantity: item.quantity,
            location: item.location.clone(),
            description: item.description.clone(),
            images: item.images.clone(),
        }
    }

    /// Check required fields and limits. Missing fields are reported together.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.location.trim().is_empty() {
            missing.push("location");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let description_len = self.description.chars().count();
        if description_len > limits::MAX_DESCRIPTION_CHARS {
            return Err(ValidationError::DescriptionTooLong {
                len: description_len,
                max: limits::MAX_DESCRIPTION_CHARS,
            });
        }
        if self.images.len() > limits::MAX_IMAGES {
            return Err(ValidationError::TooManyImages {
                count: self.images.len(),
                max: limits::MAX_IMAGES,
            });
        }
        Ok(())
    }
}

/// Parse a quantity typed by the user
pub fn parse_quantity(input: &str) -> Result<u32, ValidationError> {
    input
        .trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidQuantity(input.to_string()))
}

/// Relative change applied to an item's quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityAdjustment {
    Add(u32),
    Remove(u32),
}

impl QuantityAdjustment {
    /// Resulting quantity, rejecting zero amounts, overflow and negative results
    pub fn apply(self, current: u32) -> Result<u32, ValidationError> {
        match self {
            Self::Add(0) | Self::Remove(0) => Err(ValidationError::ZeroAdjustment),
            Self::Add(amount) => current
                .checked_add(amount)
                .ok_or(ValidationError::QuantityOverflow),
            Self::Remove(amount) => current
                .checked_sub(amount)
                .ok_or(ValidationError::NegativeQuantity { current, removing: amount }),
        }
    }
}

/// Persisted theme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Auto => "auto",
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "auto" => Some(ThemePreference::Auto),
            "light" => Some(ThemePreference::Light),
            "dark" => Some(ThemePreference::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_key_trims_and_folds_case() {
        assert_eq!(title_key("  Screws "), "screws");
        assert_eq!(title_key("SCREWS"), title_key("screws "));
    }

    #[test]
    fn test_item_serializes_with_storage_field_names() {
        let item = Item {
            id: ItemId::from("1700000000000"),
            title: "Screws".to_string(),
            images: vec![PathBuf::from("/data/images/img_1.jpg")],
            quantity: 10,
            location: "Garage".to_string(),
            description: String::new(),
        };

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], "1700000000000");
        assert_eq!(value["title"], "Screws");
        assert_eq!(value["images"][0], "/data/images/img_1.jpg");
        assert_eq!(value["quantity"], 10);
        assert_eq!(value["location"], "Garage");
        assert_eq!(value["description"], "");
    }

    #[test]
    fn test_item_missing_optional_fields_default() {
        let item: Item =
            serde_json::from_str(r#"{"id":"a","title":"Box","quantity":2}"#).unwrap();
        assert!(item.images.is_empty());
        assert_eq!(item.location, "");
        assert_eq!(item.description, "");
    }

    #[test]
    fn test_negative_quantity_rejected_by_type() {
        let parsed = serde_json::from_str::<Item>(r#"{"id":"a","title":"Box","quantity":-1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_reports_all_missing_fields() {
        let draft = ItemDraft::new("  ", 3, "");
        match draft.validate() {
            Err(ValidationError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["title", "location"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validate_limits() {
        let long = ItemDraft::new("Box", 1, "Attic").with_description("x".repeat(501));
        assert!(matches!(long.validate(), Err(ValidationError::DescriptionTooLong { len: 501, .. })));

        let images = (0..6).map(|i| PathBuf::from(format!("{i}.jpg"))).collect();
        let crowded = ItemDraft::new("Box", 1, "Attic").with_images(images);
        assert!(matches!(crowded.validate(), Err(ValidationError::TooManyImages { count: 6, .. })));

        let ok = ItemDraft::new("Box", 0, "Attic").with_description("x".repeat(500));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(" 12 ").unwrap(), 12);
        assert!(matches!(parse_quantity("-3"), Err(ValidationError::InvalidQuantity(_))));
        assert!(matches!(parse_quantity("abc"), Err(ValidationError::InvalidQuantity(_))));
    }

    #[test]
    fn test_quantity_adjustment() {
        assert_eq!(QuantityAdjustment::Add(5).apply(10).unwrap(), 15);
        assert_eq!(QuantityAdjustment::Remove(10).apply(10).unwrap(), 0);
        assert!(matches!(
            QuantityAdjustment::Remove(11).apply(10),
            Err(ValidationError::NegativeQuantity { current: 10, removing: 11 })
        ));
        assert!(matches!(QuantityAdjustment::Add(0).apply(1), Err(ValidationError::ZeroAdjustment)));
        assert!(matches!(
            QuantityAdjustment::Add(1).apply(u32::MAX),
            Err(ValidationError::QuantityOverflow)
        ));
    }

    #[test]
    fn test_matches_query() {
        let item = Item::from_draft(
            ItemDraft::new("Drill", 1, "Garage").with_description("Cordless, blue case"),
        );
        assert!(item.matches_query("dri"));
        assert!(item.matches_query("GARAGE"));
        assert!(item.matches_query("blue"));
        assert!(item.matches_query(""));
        assert!(!item.matches_query("kitchen"));
    }

    #[test]
    fn test_theme_preference_serialization() {
        assert_eq!(ThemePreference::Dark.as_str(), "dark");
        assert_eq!(ThemePreference::parse("light"), Some(ThemePreference::Light));
        assert_eq!(ThemePreference::parse("sepia"), None);
        assert_eq!(serde_json::to_string(&ThemePreference::Auto).unwrap(), "\"auto\"");
    }
}
