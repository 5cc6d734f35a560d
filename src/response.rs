//! Success payloads returned by the operations.

use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Display-index values of the rows just outside a list page; `-1` when there is none.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShowIndexInfo {
    pub pre: Value,
    pub next: Value,
}

impl Default for ShowIndexInfo {
    fn default() -> Self {
        ShowIndexInfo {
            pre: Value::from(-1),
            next: Value::from(-1),
        }
    }
}

/// One page of a list. Serializes as
/// `{"PageNumber", "PageSize", "TotalCount", "PageCount", "ShowIndex"?, "<Main>List"}`.
#[derive(Clone, Debug, PartialEq)]
pub struct ListPage<T = Value> {
    pub page_number: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub page_count: i64,
    pub show_index: Option<ShowIndexInfo>,
    /// Key the items are listed under.
    pub list_key: String,
    pub items: Vec<T>,
}

impl<T> ListPage<T> {
    /// Same page metadata, items converted.
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> ListPage<U> {
        ListPage {
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            page_count: self.page_count,
            show_index: self.show_index,
            list_key: self.list_key,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

impl<T: Serialize> Serialize for ListPage<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.show_index.is_some() { 6 } else { 5 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("PageNumber", &self.page_number)?;
        map.serialize_entry("PageSize", &self.page_size)?;
        map.serialize_entry("TotalCount", &self.total_count)?;
        map.serialize_entry("PageCount", &self.page_count)?;
        if let Some(si) = &self.show_index {
            map.serialize_entry("ShowIndex", si)?;
        }
        map.serialize_entry(&self.list_key, &self.items)?;
        map.end()
    }
}

/// A single record keyed by its main model name: `{"User": {...}}`.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailPayload {
    pub key: String,
    pub item: Map<String, Value>,
}

impl Serialize for DetailPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.item)?;
        map.end()
    }
}

/// Affected row count: `{"Affected": n}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Affected {
    #[serde(rename = "Affected")]
    pub affected: u64,
}

impl Affected {
    pub fn new(affected: u64) -> Self {
        Affected { affected }
    }
}

/// Primary-key values of a created record, keyed by field name.
pub type CreatedKeys = Map<String, Value>;

impl<T: Serialize> IntoResponse for ListPage<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for DetailPayload {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for Affected {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
