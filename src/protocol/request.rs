//! Page request and its query-string form

use super::types::{Cursor, HeaderSelection};
use crate::error::{Error, Result};
use crate::types::PartitionId;
use std::collections::HashMap;

const PARTITION_COUNT_PARAM: &str = "n";
const CURSOR_PARAM_PREFIX: &str = "cursor";
const HEADERS_PARAM: &str = "headers";
const PAGE_SIZE_HINT_PARAM: &str = "pagesizehint";

/// Everything a client sends to obtain one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of partitions the client believes the feed has
    pub partition_count: usize,
    /// Starting cursor per requested partition
    pub cursors: Vec<Cursor>,
    /// Header selection directive
    pub headers: HeaderSelection,
    /// Suggested number of events per partition
    pub page_size_hint: Option<usize>,
}

impl PageRequest {
    /// Create a request with no headers and no page size hint
    pub fn new(partition_count: usize, cursors: Vec<Cursor>) -> Self {
        Self {
            partition_count,
            cursors,
            headers: HeaderSelection::None,
            page_size_hint: None,
        }
    }

    /// Set the header selection
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderSelection) -> Self {
        self.headers = headers;
        self
    }

    /// Set the page size hint (zero means no hint)
    #[must_use]
    pub fn with_page_size_hint(mut self, hint: Option<usize>) -> Self {
        self.page_size_hint = hint.filter(|h| *h > 0);
        self
    }

    /// Starting cursor for a partition, if the request carries one
    pub fn cursor_for(&self, partition: PartitionId) -> Option<&Cursor> {
        self.cursors.iter().find(|c| c.partition == partition)
    }

    /// Partitions this request asks for, in request order
    pub fn partitions(&self) -> Vec<PartitionId> {
        self.cursors.iter().map(|c| c.partition).collect()
    }

    /// Render as query parameters
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![(
            PARTITION_COUNT_PARAM.to_string(),
            self.partition_count.to_string(),
        )];

        for cursor in &self.cursors {
            query.push((
                format!("{CURSOR_PARAM_PREFIX}{}", cursor.partition),
                cursor.token.clone(),
            ));
        }

        if let Some(headers) = self.headers.to_param() {
            query.push((HEADERS_PARAM.to_string(), headers));
        }

        if let Some(hint) = self.page_size_hint.filter(|h| *h > 0) {
            query.push((PAGE_SIZE_HINT_PARAM.to_string(), hint.to_string()));
        }

        query
    }

    /// Parse query parameters.
    ///
    /// Only `cursor0` .. `cursor{n-1}` are considered and empty cursor values
    /// are skipped. The page size hint is left unset: parse it with
    /// [`PageRequest::page_size_hint_from_query`] once the request has been
    /// validated. Whether the resulting request is acceptable (partition
    /// count, missing cursors) is decided by the handler.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self> {
        let partition_count: usize = params
            .get(PARTITION_COUNT_PARAM)
            .ok_or_else(|| Error::missing_parameter(PARTITION_COUNT_PARAM))?
            .trim()
            .parse()
            .map_err(|_| Error::invalid_parameter(PARTITION_COUNT_PARAM))?;

        let mut cursors: Vec<Cursor> = params
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(key, value)| {
                let index = cursor_index(key)?;
                if index >= partition_count {
                    return None;
                }
                let partition = PartitionId::try_from(index).ok()?;
                Some(Cursor::new(partition, value.clone()))
            })
            .collect();
        cursors.sort_by_key(|c| c.partition);

        let headers = HeaderSelection::parse(params.get(HEADERS_PARAM).map(String::as_str));

        Ok(Self::new(partition_count, cursors).with_headers(headers))
    }

    /// Parse the `pagesizehint` parameter; absent or empty means no hint
    pub fn page_size_hint_from_query(params: &HashMap<String, String>) -> Result<Option<usize>> {
        match params.get(PAGE_SIZE_HINT_PARAM).map(|v| v.trim()) {
            Some(value) if !value.is_empty() => value
                .parse::<usize>()
                .map(Some)
                .map_err(|_| Error::invalid_parameter(PAGE_SIZE_HINT_PARAM)),
            _ => Ok(None),
        }
    }
}

/// Partition index of a `cursor{i}` key, in canonical decimal form only
fn cursor_index(key: &str) -> Option<usize> {
    let digits = key.strip_prefix(CURSOR_PARAM_PREFIX)?;
    let index = digits.parse::<usize>().ok()?;
    (digits == index.to_string()).then_some(index)
}
