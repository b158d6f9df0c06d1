//! Riak HTTP client implementation

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::headers;
use crate::transport::{HyperTransport, Transport};
use crate::types::*;

const JSON_MEDIA_TYPE: &str = "application/json";
const TEXT_MEDIA_TYPE: &str = "text/plain";

/// Characters left unencoded in a single path segment. `/` is encoded so a
/// key can never escape its bucket.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Percent-encode a key, bucket or index term for use in a URI path.
fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Validates that a key can be sent to Riak.
///
/// Keys must not be empty and must not contain control characters
/// (tab excepted).
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey(key.to_string()));
    }

    if key.chars().any(|ch| ch < ' ' && ch != '\t') {
        return Err(Error::InvalidKey(key.to_string()));
    }

    Ok(())
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
        .unwrap_or(false)
}

/// Decode a 200 response into a stored value plus its raw headers
fn decode_object(response: Response<Bytes>) -> Result<ObjectResponse> {
    let (parts, bytes) = response.into_parts();
    let metadata = headers::decode(&parts.headers);

    let body = if is_json(&metadata.content_type) {
        Body::Structured(serde_json::from_slice(&bytes)?)
    } else {
        Body::Raw(String::from_utf8_lossy(&bytes).into_owned())
    };

    Ok(ObjectResponse {
        value: StoredValue { body, metadata },
        headers: parts.headers,
    })
}

/// Async client bound to one Riak bucket.
///
/// Cloning is cheap; clones share configuration and transport.
///
/// # Example
/// ```rust,no_run
/// use riak_http::{Client, ClientConfig};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), riak_http::Error> {
///     let client = Client::with_config(ClientConfig::new("users").with_host("riak.local"))?;
///
///     client.put("alice", json!({"name": "Alice", "meta": {"team": "ops"}}), None).await?;
///     let stored = client.get("alice").await?;
///     println!("vclock: {}", stored.value.metadata.vclock);
///
///     client.delete("alice").await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client for `bucket` with host, port and concurrency taken
    /// from the environment or defaults.
    pub fn new(bucket: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(bucket))
    }

    /// Create a client over the default HTTP transport
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, HyperTransport::new())
    }

    /// Create a client over a caller-supplied transport
    pub fn with_transport<T>(config: ClientConfig, transport: T) -> Result<Self>
    where
        T: Transport + 'static,
    {
        if config.bucket.is_empty() {
            return Err(Error::InvalidArgument("bucket name cannot be empty".to_string()));
        }
        if config.concurrency_limit == 0 {
            return Err(Error::InvalidArgument(
                "concurrency limit must be at least 1".to_string(),
            ));
        }

        let base = config.base_url();
        let _: Uri = base
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;

        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
        })
    }

    /// Resolved configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Bucket every operation targets
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// URL of `key` in this client's bucket
    pub fn url(&self, key: &str) -> String {
        format!(
            "{}/buckets/{}/keys/{}",
            self.config.base_url(),
            encode_segment(&self.config.bucket),
            encode_segment(key)
        )
    }

    /// Internal request method
    async fn request(
        &self,
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response<Bytes>> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;

        debug!("riak url: {} {}", method, url);
        trace!(?headers, "riak request headers");

        let mut request = Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        let response = self.transport.send(request).await?;

        debug!("riak response code: {}", response.status().as_u16());
        trace!(headers = ?response.headers(), "riak response headers");

        Ok(response)
    }

    /// Fetch `key`.
    ///
    /// A missing key is not an error: it yields an empty [`StoredValue`].
    pub async fn get(&self, key: &str) -> Result<ObjectResponse> {
        validate_key(key)?;

        let response = self
            .request(Method::GET, self.url(key), HeaderMap::new(), Bytes::new())
            .await?;

        match response.status() {
            StatusCode::OK => decode_object(response),
            StatusCode::NOT_FOUND => Ok(ObjectResponse {
                value: StoredValue::empty(),
                headers: response.into_parts().0.headers,
            }),
            status => Err(Error::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }

    /// Store `body` under `key` and return what Riak stored.
    ///
    /// A structured body is sent as JSON; when it is an object, its
    /// `vclock`, `links`, `meta` and `index` fields are moved into headers
    /// (overriding the same headers in `headers`) and left out of the stored
    /// document. Raw bodies default to `text/plain`.
    pub async fn put(
        &self,
        key: &str,
        body: impl Into<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<ObjectResponse> {
        validate_key(key)?;

        let mut request_headers = headers.unwrap_or_default();
        let payload = match body.into() {
            Body::Raw(text) => Bytes::from(text),
            Body::Structured(value) => {
                request_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
                let (metadata_headers, document) = headers::split_metadata(&value)?;
                request_headers.extend(metadata_headers);
                Bytes::from(serde_json::to_vec(&document)?)
            }
        };

        if !request_headers.contains_key(CONTENT_TYPE) {
            request_headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_MEDIA_TYPE));
        }

        let url = format!("{}?returnbody=true", self.url(key));
        let response = self
            .request(Method::PUT, url, request_headers, payload)
            .await?;

        match response.status() {
            StatusCode::OK => decode_object(response),
            status => Err(Error::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }

    /// Delete `key`. Deleting a missing key succeeds.
    pub async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let response = self
            .request(Method::DELETE, self.url(key), HeaderMap::new(), Bytes::new())
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
            status => Err(Error::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }

    /// URL of a secondary-index query, with `options` as the query string
    pub fn index_url(&self, index: &str, query: &IndexQuery, options: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}/buckets/{}/index/{}",
            self.config.base_url(),
            encode_segment(&self.config.bucket),
            encode_segment(index)
        );

        match query {
            IndexQuery::Exact(value) => {
                url.push('/');
                url.push_str(&encode_segment(value));
            }
            IndexQuery::Range { start, end } => {
                url.push('/');
                url.push_str(&encode_segment(start));
                url.push('/');
                url.push_str(&encode_segment(end));
            }
        }

        if !options.is_empty() {
            let qs = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(options)
                .finish();
            url.push('?');
            url.push_str(&qs);
        }

        url
    }

    /// Query a secondary index for matching keys.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use riak_http::{Client, IndexQuery};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), riak_http::Error> {
    /// # let client = Client::new("users")?;
    /// let adults = client
    ///     .index_query(
    ///         "age_int",
    ///         &IndexQuery::Range { start: "18".into(), end: "150".into() },
    ///         &[("max_results", "100")],
    ///     )
    ///     .await?;
    /// println!("{} keys", adults.keys.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn index_query(
        &self,
        index: &str,
        query: &IndexQuery,
        options: &[(&str, &str)],
    ) -> Result<IndexResponse> {
        if index.is_empty() {
            return Err(Error::InvalidArgument("index name cannot be empty".to_string()));
        }
        let empty_term = match query {
            IndexQuery::Exact(value) => value.is_empty(),
            IndexQuery::Range { start, end } => start.is_empty() || end.is_empty(),
        };
        if empty_term {
            return Err(Error::InvalidArgument(format!(
                "empty query term for index {}",
                index
            )));
        }

        let url = self.index_url(index, query, options);
        let response = self
            .request(Method::GET, url, HeaderMap::new(), Bytes::new())
            .await?;

        match response.status() {
            StatusCode::OK => Ok(serde_json::from_slice(response.body())?),
            status => Err(Error::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }
}
