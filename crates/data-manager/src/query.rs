//! Query-string building for list endpoints

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Ordered query parameters; empty values are skipped and `set` replaces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        let value = value.to_string();
        if value.is_empty() {
            return self;
        }
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
        self
    }

    pub fn set_opt<V: ToString>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `?a=1&b=2`, or an empty string without parameters
    pub fn to_query_string(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        format!("?{}", encoded)
    }
}

/// Filters accepted by the project, blog and category list endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub published: Option<bool>,
    pub search: Option<String>,
}

impl ContentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page 1, 10 per page, newest first
    pub fn paginated() -> Self {
        Self {
            page: Some(1),
            limit: Some(10),
            sort: Some("-createdAt".to_string()),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Merge into `params`; values set here win over existing ones
    pub fn apply_to(&self, params: &mut QueryParams) {
        params
            .set_opt("page", self.page)
            .set_opt("limit", self.limit)
            .set_opt("sort", self.sort.as_deref())
            .set_opt("category", self.category.as_deref())
            .set_opt("featured", self.featured)
            .set_opt("published", self.published)
            .set_opt("search", self.search.as_deref());
    }

    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        self.apply_to(&mut params);
        params
    }
}

/// Percent-encode one path segment
pub fn encode_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
