use crate::client::{new_search_id, SearchNoteType, SearchSortType};
use crate::CrawlerError;
use serde_json::Value;

/// Only search items of this model type are notes
const NOTE_MODEL_TYPE: &str = "note";

/// One keyword search request
///
/// A query is immutable once built; [`SearchQuery::next_page`] derives the
/// query for the following page with the same search id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    keyword: String,
    page: u32,
    page_size: u32,
    sort: SearchSortType,
    note_type: SearchNoteType,
    search_id: String,
}

impl SearchQuery {
    /// Builds the first-page query for `keyword`
    pub fn new(
        keyword: &str,
        page_size: u32,
        sort: SearchSortType,
        note_type: SearchNoteType,
    ) -> Result<Self, CrawlerError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CrawlerError::Config(crate::ConfigError::Validation(
                "search keyword cannot be empty".to_string(),
            )));
        }
        if page_size == 0 {
            return Err(CrawlerError::Config(crate::ConfigError::Validation(
                "search page size must be at least 1".to_string(),
            )));
        }
        Ok(Self {
            keyword: keyword.to_string(),
            page: 1,
            page_size,
            sort,
            note_type,
            search_id: new_search_id(),
        })
    }

    /// Query for the following page
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort(&self) -> SearchSortType {
        self.sort
    }

    pub fn note_type(&self) -> SearchNoteType {
        self.note_type
    }

    pub fn search_id(&self) -> &str {
        &self.search_id
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Note ids in result order
    pub note_ids: Vec<String>,
    /// Items the platform returned, notes or not
    pub item_count: usize,
    pub has_more: bool,
}

impl SearchPage {
    /// Parses a `{has_more, items}` payload, keeping only note items with an id
    pub fn from_response(data: &Value) -> Result<Self, String> {
        let items: &[Value] = match data.get("items") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) | None => &[],
            Some(other) => return Err(format!("items is not a list: {}", other)),
        };
        let note_ids = items
            .iter()
            .filter(|item| {
                item.get("model_type")
                    .and_then(Value::as_str)
                    .map_or(true, |kind| kind == NOTE_MODEL_TYPE)
            })
            .filter_map(|item| item.get("id").and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self {
            note_ids,
            item_count: items.len(),
            has_more: data.get("has_more").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}
