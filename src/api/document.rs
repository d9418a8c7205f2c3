use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value};

use super::resource::{data, key, Included, JsonApiResource};

pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Page position of a collection document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Total known up front
    LengthAware { page: u64, per_page: u64, total: u64 },
    /// Only whether another page follows is known
    Simple { page: u64, per_page: u64, has_more: bool },
}

impl Pagination {
    /// `{page, per_page, next, prev, count?, last_page?}`
    pub fn meta(&self) -> Map<String, Value> {
        let (page, per_page, has_more) = match *self {
            Pagination::LengthAware { page, per_page, total } => {
                (page, per_page, page.saturating_mul(per_page) < total)
            }
            Pagination::Simple { page, per_page, has_more } => (page, per_page, has_more),
        };

        let mut meta = Map::new();
        meta.insert("page".into(), json!(page));
        meta.insert("per_page".into(), json!(per_page));
        meta.insert("next".into(), if has_more { json!(page + 1) } else { Value::Null });
        meta.insert("prev".into(), if page > 1 { json!(page - 1) } else { Value::Null });

        if let Pagination::LengthAware { total, .. } = *self {
            let last_page = if per_page == 0 { 1 } else { total.div_ceil(per_page).max(1) };
            meta.insert("count".into(), json!(total));
            meta.insert("last_page".into(), json!(last_page));
        }
        meta
    }
}

/// A top-level `{data, included?, meta?}` document
#[derive(Debug)]
pub struct JsonApiResponse {
    data: Value,
    included: Vec<Value>,
    meta: Map<String, Value>,
    status: StatusCode,
    headers: HeaderMap,
}

impl JsonApiResponse {
    fn new(data: Value, included: Included) -> Self {
        Self {
            data,
            included: included.into_values(),
            meta: Map::new(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    pub fn resource(resource: &dyn JsonApiResource) -> Self {
        let mut included = Included::new();
        // primary data never repeats under included
        included.claim(key(resource));
        let data = data(resource, &mut included);
        Self::new(data, included)
    }

    pub fn collection<R: JsonApiResource>(resources: &[R]) -> Self {
        let mut included = Included::new();
        for resource in resources {
            included.claim(key(resource));
        }
        let data = resources
            .iter()
            .map(|resource| data(resource, &mut included))
            .collect();
        Self::new(Value::Array(data), included)
    }

    pub fn paginated<R: JsonApiResource>(resources: &[R], pagination: Pagination) -> Self {
        Self::collection(resources).with_meta(pagination.meta())
    }

    /// Merge keys into the top-level `meta`
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta.extend(meta);
        self
    }

    pub fn meta_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut document = Map::new();
        document.insert("data".into(), self.data.clone());
        if !self.included.is_empty() {
            document.insert("included".into(), Value::Array(self.included.clone()));
        }
        if !self.meta.is_empty() {
            document.insert("meta".into(), Value::Object(self.meta.clone()));
        }
        Value::Object(document)
    }
}

impl IntoResponse for JsonApiResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.to_value())).into_response();
        let headers = response.headers_mut();
        headers.extend(self.headers);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_API_CONTENT_TYPE),
        );
        response
    }
}
