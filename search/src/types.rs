//! Typesense wire types

use recipe_catalog_core::{RecipeAggregate, SearchDocument};
use serde::{Deserialize, Serialize};

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "recipes";

/// Fields matched by free-text search
pub const QUERY_BY: &str = "name,descr,ingredients,steps";

/// One field of a collection schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Field name
    pub name: &'static str,
    /// Typesense type, e.g. `string[]`
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Whether the field can be faceted on
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub facet: bool,
}

impl Field {
    const fn new(name: &'static str, kind: &'static str) -> Self {
        Self {
            name,
            kind,
            facet: false,
        }
    }

    const fn facet(name: &'static str, kind: &'static str) -> Self {
        Self {
            name,
            kind,
            facet: true,
        }
    }
}

/// Collection schema sent on creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSchema {
    /// Collection name
    pub name: String,
    /// Indexed fields
    pub fields: Vec<Field>,
}

impl CollectionSchema {
    /// Schema for recipe documents
    #[must_use]
    pub fn recipes(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![
                Field::new("name", "string"),
                Field::new("descr", "string"),
                Field::new("diff", "string"),
                Field::facet("filters", "string[]"),
                Field::new("imgs", "string"),
                Field::new("authorid", "string"),
                Field::new("ingredients", "string"),
                Field::new("steps", "string"),
                Field::new("review_count", "int32"),
                Field::new("avg_rating", "float"),
            ],
        }
    }
}

/// Partial document carrying only the aggregate fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregatePatch {
    /// Number of reviews
    pub review_count: u32,
    /// Mean rating
    pub avg_rating: f64,
}

impl From<RecipeAggregate> for AggregatePatch {
    fn from(aggregate: RecipeAggregate) -> Self {
        Self {
            review_count: aggregate.review_count,
            avg_rating: aggregate.avg_rating,
        }
    }
}

/// Search response body
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Total matches
    #[serde(default)]
    pub found: u64,
    /// Matching documents
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// One search hit
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    /// The stored document
    pub document: SearchDocument,
}

impl SearchResponse {
    /// The documents, in ranking order.
    #[must_use]
    pub fn into_documents(self) -> Vec<SearchDocument> {
        self.hits.into_iter().map(|hit| hit.document).collect()
    }
}

/// `filter_by` expression matching any of `filters`.
///
/// Values are backtick-quoted so commas and spaces inside a tag survive.
#[must_use]
pub fn filter_expression(filters: &[String]) -> String {
    let values: Vec<String> = filters
        .iter()
        .map(|f| format!("`{}`", f.replace('`', "")))
        .collect();
    format!("filters:[{}]", values.join(","))
}
