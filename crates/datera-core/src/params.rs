//! List parameters shared by every collection endpoint.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::{QueryMap, QueryParams};

/// Query key for result filtering.
pub const FILTER: &str = "filter";
/// Query key for page size.
pub const LIMIT: &str = "limit";
/// Query key for ordering.
pub const SORT: &str = "sort";
/// Query key for page start.
pub const OFFSET: &str = "offset";
/// Query key for relative time windows.
pub const SINCE: &str = "since";
/// Query key for absolute window start.
pub const FROM: &str = "from";
/// Query key for absolute window end.
pub const TO: &str = "to";

/// Paging, filtering and ordering options for list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Server-side filter expression
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filter: String,
    /// Maximum number of items per page (0 = server default)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub limit: u64,
    /// Sort expression
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sort: String,
    /// Index of the first item (0 = start)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: u64,
}

impl ListParams {
    /// Create empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the sort expression.
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Set the page start.
    #[must_use]
    pub const fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Returns true if the caller asked for a specific page window.
    #[must_use]
    pub const fn is_windowed(&self) -> bool {
        self.limit != 0 || self.offset != 0
    }

    /// Convert to query parameters, omitting empty and zero fields.
    #[must_use]
    pub fn to_map(&self) -> QueryMap {
        let mut params = QueryParams::new();
        params.push_non_empty(FILTER, &self.filter);
        params.push_non_zero(LIMIT, self.limit);
        params.push_non_empty(SORT, &self.sort);
        params.push_non_zero(OFFSET, self.offset);
        params.into_map()
    }

    /// Read list parameters back out of a query map. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `limit` or `offset` is not a
    /// non-negative number.
    pub fn from_map(map: &QueryMap) -> Result<Self> {
        Ok(Self {
            filter: map.get(FILTER).cloned().unwrap_or_default(),
            limit: parse_count(map, LIMIT)?,
            sort: map.get(SORT).cloned().unwrap_or_default(),
            offset: parse_count(map, OFFSET)?,
        })
    }
}

/// List parameters for time-ranged collections (events, metrics).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRangeParams {
    /// Relative window (e.g. `1h`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub since: String,
    /// Window start
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    /// Window end
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    /// Paging, filtering and ordering
    #[serde(flatten)]
    pub list: ListParams,
}

impl ListRangeParams {
    /// Create empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative window.
    #[must_use]
    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = since.into();
        self
    }

    /// Set the absolute window.
    #[must_use]
    pub fn with_window(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    /// Set the paging options.
    #[must_use]
    pub fn with_list(mut self, list: ListParams) -> Self {
        self.list = list;
        self
    }

    /// Convert to query parameters, omitting empty and zero fields.
    #[must_use]
    pub fn to_map(&self) -> QueryMap {
        let mut map = self.list.to_map();
        let mut params = QueryParams::new();
        params.push_non_empty(SINCE, &self.since);
        params.push_non_empty(FROM, &self.from);
        params.push_non_empty(TO, &self.to);
        map.extend(params.into_map());
        map
    }

    /// Read range parameters back out of a query map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `limit` or `offset` is not a
    /// non-negative number.
    pub fn from_map(map: &QueryMap) -> Result<Self> {
        Ok(Self {
            since: map.get(SINCE).cloned().unwrap_or_default(),
            from: map.get(FROM).cloned().unwrap_or_default(),
            to: map.get(TO).cloned().unwrap_or_default(),
            list: ListParams::from_map(map)?,
        })
    }
}

fn parse_count(map: &QueryMap, key: &str) -> Result<u64> {
    match map.get(key).map(String::as_str) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| Error::InvalidParams(format!("`{key}` must be a count, got `{raw}`: {err}"))),
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_round_trip_keeps_set_fields() {
        let params = ListParams::new()
            .with_filter("match(name,.*pool.*)")
            .with_limit(25)
            .with_offset(75);

        let map = params.to_map();
        assert_eq!(map.len(), 3);
        assert!(!map.contains_key(SORT));
        assert_eq!(ListParams::from_map(&map).unwrap(), params);
    }

    #[test]
    fn empty_list_params_produce_empty_map() {
        assert!(ListParams::default().to_map().is_empty());
        assert_eq!(
            ListParams::from_map(&QueryMap::new()).unwrap(),
            ListParams::default()
        );
    }

    #[test]
    fn from_map_ignores_unknown_keys() {
        let mut map = QueryMap::new();
        map.insert("sort".into(), "name".into());
        map.insert("tenant".into(), "/root/t1".into());

        let params = ListParams::from_map(&map).unwrap();
        assert_eq!(params.sort, "name");
        assert!(!params.is_windowed());
    }

    #[test]
    fn from_map_rejects_non_numeric_limit() {
        let mut map = QueryMap::new();
        map.insert("limit".into(), "ten".into());

        let err = ListParams::from_map(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn from_map_rejects_negative_counts() {
        for key in [LIMIT, OFFSET] {
            let mut map = QueryMap::new();
            map.insert(key.into(), "-1".into());

            let err = ListParams::from_map(&map).unwrap_err();
            assert!(matches!(err, Error::InvalidParams(_)));
        }
    }

    #[test]
    fn windowed_detection() {
        assert!(ListParams::new().with_limit(10).is_windowed());
        assert!(ListParams::new().with_offset(10).is_windowed());
        assert!(!ListParams::new().with_sort("name").is_windowed());
    }

    #[test]
    fn range_params_round_trip() {
        let params = ListRangeParams::new()
            .with_window("2024-01-01T00:00:00", "2024-01-02T00:00:00")
            .with_list(ListParams::new().with_limit(100));

        let map = params.to_map();
        assert_eq!(map.get(FROM).map(String::as_str), Some("2024-01-01T00:00:00"));
        assert_eq!(map.get(LIMIT).map(String::as_str), Some("100"));
        assert!(!map.contains_key(SINCE));
        assert_eq!(ListRangeParams::from_map(&map).unwrap(), params);
    }
}
