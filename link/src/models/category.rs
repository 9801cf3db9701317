use serde::{Deserialize, Serialize};

/// A subcategory inside a [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    /// Subcategory ID
    pub id: i64,
    /// URL slug
    pub slug: String,
    /// Display name
    pub name: String,
}

/// A top-level post category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Category ID
    pub id: i64,
    /// URL slug
    pub slug: String,
    /// Display name
    pub name: String,
    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Subcategories in display order
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    /// Look up a subcategory by slug.
    pub fn subcategory(&self, slug: &str) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| s.slug == slug)
    }
}
