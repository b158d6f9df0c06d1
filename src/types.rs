//! Data types for the Riak HTTP client

use std::collections::BTreeMap;

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single entry of the `Link` header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target resource path, e.g. `/buckets/list/keys/1`
    pub link: String,
    /// `riaktag` value; empty when the link is untagged
    #[serde(default)]
    pub tag: String,
}

impl Link {
    /// Build a link to `link` tagged `tag`
    pub fn new(link: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            tag: tag.into(),
        }
    }
}

/// Riak annotations carried in response headers alongside an object.
///
/// Every field is always present; absence is the empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Opaque causality token (`X-Riak-Vclock`)
    #[serde(default)]
    pub vclock: String,
    /// Tagged links in header order
    #[serde(default)]
    pub links: Vec<Link>,
    /// User metadata (`X-Riak-Meta-*`)
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    /// Secondary-index bindings (`X-Riak-Index-*`)
    #[serde(default)]
    pub index: BTreeMap<String, String>,
    /// Response `Content-Type`
    #[serde(default, rename = "contentType")]
    pub content_type: String,
}

impl ObjectMetadata {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Object payload as stored in Riak
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Text stored verbatim, sent as `text/plain` unless overridden
    Raw(String),
    /// JSON document, sent as `application/json`
    Structured(Value),
}

impl Default for Body {
    fn default() -> Self {
        Body::Structured(Value::Object(Map::new()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Raw(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Raw(s.to_string())
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Body::Structured(v)
    }
}

/// Decoded result of a read or write: body plus the metadata Riak returned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredValue {
    /// Object payload with metadata fields removed
    pub body: Body,
    /// Annotations decoded from the response headers
    pub metadata: ObjectMetadata,
}

impl StoredValue {
    /// The value reported for a key that does not exist
    pub fn empty() -> Self {
        Self::default()
    }

    /// True for the value produced by a 404 read
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && matches!(&self.body, Body::Structured(Value::Object(m)) if m.is_empty())
    }

    /// The body as text, if it was stored raw
    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            Body::Raw(s) => Some(s),
            Body::Structured(_) => None,
        }
    }

    /// Look up a top-level field of a structured object body
    pub fn field(&self, name: &str) -> Option<&Value> {
        match &self.body {
            Body::Structured(Value::Object(map)) => map.get(name),
            _ => None,
        }
    }

    /// Merged view: body fields with `vclock`, `links`, `meta`, `index` and
    /// `contentType` as siblings. Metadata overwrites same-named body fields.
    /// A non-object body is placed under `"body"`.
    pub fn to_json(&self) -> Value {
        let mut merged = match &self.body {
            Body::Structured(Value::Object(map)) => map.clone(),
            Body::Structured(other) => {
                let mut map = Map::new();
                map.insert("body".to_string(), other.clone());
                map
            }
            Body::Raw(text) => {
                let mut map = Map::new();
                map.insert("body".to_string(), Value::String(text.clone()));
                map
            }
        };

        // ObjectMetadata always serializes to an object
        if let Ok(Value::Object(meta)) = serde_json::to_value(&self.metadata) {
            merged.extend(meta);
        }

        Value::Object(merged)
    }
}

/// A stored value together with the raw response headers it was decoded from
#[derive(Debug, Clone, Default)]
pub struct ObjectResponse {
    /// Decoded body and metadata
    pub value: StoredValue,
    /// Response headers as received
    pub headers: HeaderMap,
}

/// One write in a [`batch_put`](crate::Client::batch_put)
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Target key in the client's bucket
    pub key: String,
    /// Payload to store
    pub body: Body,
    /// Extra request headers, merged under any inline metadata
    pub headers: Option<HeaderMap>,
}

impl PutRequest {
    /// A write of `body` to `key` with no extra headers
    pub fn new(key: impl Into<String>, body: impl Into<Body>) -> Self {
        Self {
            key: key.into(),
            body: body.into(),
            headers: None,
        }
    }

    /// Attach extra request headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Match criterion for a secondary-index query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexQuery {
    /// `/index/{name}/{value}`
    Exact(String),
    /// `/index/{name}/{start}/{end}`, inclusive
    Range {
        /// Lower bound
        start: String,
        /// Upper bound
        end: String,
    },
}

/// Response from a secondary-index query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    /// Matching keys
    #[serde(default)]
    pub keys: Vec<String>,
    /// Pagination token, present when `max_results` truncated the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
}
