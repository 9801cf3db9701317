use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// A published post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post ID
    pub id: i64,
    /// URL slug
    pub slug: String,
    /// Title
    pub title: String,
    /// Raw Markdown body (rendering is up to the caller)
    #[serde(default)]
    pub content: String,
    /// Short preview shown in list views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Author
    pub author: UserSummary,
    /// Category slug
    pub category: String,
    /// Subcategory slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cover image URL (hosted by a third-party asset service)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    /// Number of likes
    #[serde(default)]
    pub like_count: u64,
    /// Number of comments
    #[serde(default)]
    pub comment_count: u64,
    /// Number of bookmarks
    #[serde(default)]
    pub bookmark_count: u64,
    /// Whether the signed-in user liked it
    #[serde(default)]
    pub liked_by_me: bool,
    /// Whether the signed-in user bookmarked it
    #[serde(default)]
    pub bookmarked_by_me: bool,
    /// Creation time in RFC3339 format
    pub created_at: String,
    /// Last edit time in RFC3339 format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Request body for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// Title
    pub title: String,
    /// Markdown body
    pub content: String,
    /// Category slug
    pub category: String,
    /// Subcategory slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Cover image URL, already uploaded elsewhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

/// Ordering for post listings. Ranking itself is computed server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    /// Newest first
    #[default]
    Latest,
    /// Server-side trending score
    Trending,
    /// Most liked
    Top,
}

impl PostSort {
    /// Query-string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostSort::Latest => "latest",
            PostSort::Trending => "trending",
            PostSort::Top => "top",
        }
    }
}

/// Filters for `GET /posts`.
///
/// Changing any field changes the query scope, so a list controller should
/// [`reset`](crate::PaginatedAccumulator::reset) when it does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PostQuery {
    /// Category slug
    pub category: Option<String>,
    /// Subcategory slug
    pub subcategory: Option<String>,
    /// Tag filter
    pub tag: Option<String>,
    /// Author username
    pub author: Option<String>,
    /// Full-text search
    pub search: Option<String>,
    /// Only posts bookmarked by the signed-in user
    #[serde(default)]
    pub bookmarked: bool,
    /// Ordering
    #[serde(default)]
    pub sort: PostSort,
}

impl PostQuery {
    /// Empty query: every post, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restrict to a subcategory.
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    /// Restrict to a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Restrict to an author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Full-text search.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Only bookmarked posts.
    pub fn bookmarked_only(mut self) -> Self {
        self.bookmarked = true;
        self
    }

    /// Set the ordering.
    pub fn with_sort(mut self, sort: PostSort) -> Self {
        self.sort = sort;
        self
    }

    /// Query-string pairs; unset filters are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let optional = [
            ("category", &self.category),
            ("subcategory", &self.subcategory),
            ("tag", &self.tag),
            ("author", &self.author),
            ("search", &self.search),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((key, value.to_string()));
            }
        }
        if self.bookmarked {
            pairs.push(("bookmarked", "true".to_string()));
        }
        pairs.push(("sort", self.sort.as_str().to_string()));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_only_sorts() {
        assert_eq!(PostQuery::new().query_pairs(), vec![("sort", "latest".to_string())]);
    }

    #[test]
    fn test_query_pairs_skip_blank_filters() {
        let query = PostQuery::new()
            .with_category("rust")
            .with_search("   ")
            .with_sort(PostSort::Trending)
            .bookmarked_only();
        assert_eq!(
            query.query_pairs(),
            vec![
                ("category", "rust".to_string()),
                ("bookmarked", "true".to_string()),
                ("sort", "trending".to_string()),
            ]
        );
    }

    #[test]
    fn test_new_post_omits_empty_optionals() {
        let post = NewPost {
            title: "Hello".into(),
            content: "# Hi".into(),
            category: "general".into(),
            subcategory: None,
            tags: Vec::new(),
            cover_image_url: None,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("subcategory").is_none());
        assert!(json.get("tags").is_none());
        assert_eq!(json["category"], "general");
    }
}
