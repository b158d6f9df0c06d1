//! Conversion between HTTP headers and Riak object metadata.
//!
//! Riak carries the causality token, links, user metadata and secondary
//! index bindings in headers rather than in the body. [`decode`] reads them
//! from a response, [`encode`] produces them for a request, and
//! [`split_metadata`] lifts them out of a JSON document about to be stored.

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LINK};
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::types::{Link, ObjectMetadata};

/// Causality token header
pub const VCLOCK_HEADER: &str = "x-riak-vclock";
/// Prefix of user metadata headers
pub const META_PREFIX: &str = "x-riak-meta-";
/// Prefix of secondary-index headers
pub const INDEX_PREFIX: &str = "x-riak-index-";

const TAG_PARAM: &str = "riaktag";
const REL_PARAM: &str = "rel";

/// Recognized header, in matching priority order
#[derive(Debug, PartialEq, Eq)]
enum HeaderKind<'a> {
    ContentType,
    Vclock,
    Link,
    Meta(&'a str),
    Index(&'a str),
}

fn classify(name: &str) -> Option<HeaderKind<'_>> {
    if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
        return Some(HeaderKind::ContentType);
    }
    if name.eq_ignore_ascii_case(VCLOCK_HEADER) {
        return Some(HeaderKind::Vclock);
    }
    if name.eq_ignore_ascii_case(LINK.as_str()) {
        return Some(HeaderKind::Link);
    }
    if let Some(key) = strip_prefix_ignore_case(name, META_PREFIX) {
        return Some(HeaderKind::Meta(key));
    }
    if let Some(key) = strip_prefix_ignore_case(name, INDEX_PREFIX) {
        return Some(HeaderKind::Index(key));
    }
    None
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        name.get(prefix.len()..).filter(|rest| !rest.is_empty())
    } else {
        None
    }
}

/// Decode Riak metadata from a header map. Unknown headers are ignored.
pub fn decode(headers: &HeaderMap) -> ObjectMetadata {
    let mut metadata = ObjectMetadata::default();

    for (name, value) in headers {
        let Some(kind) = classify(name.as_str()) else {
            continue;
        };
        let Ok(value) = value.to_str() else {
            warn!(header = %name, "skipping non-UTF-8 header value");
            continue;
        };

        match kind {
            HeaderKind::ContentType => metadata.content_type = value.to_string(),
            HeaderKind::Vclock => metadata.vclock = value.to_string(),
            HeaderKind::Link => parse_links(value, &mut metadata.links),
            HeaderKind::Meta(key) => {
                metadata.meta.insert(key.to_string(), value.to_string());
            }
            HeaderKind::Index(key) => {
                metadata.index.insert(key.to_string(), value.to_string());
            }
        }
    }

    trace!(?metadata, "decoded riak headers");
    metadata
}

/// Parse a `Link` header value, appending entries in header order.
///
/// Entries carrying `rel=...` without a `riaktag` point at server-internal
/// resources (the bucket itself) and are dropped.
fn parse_links(value: &str, links: &mut Vec<Link>) {
    for entry in value.split(',') {
        let mut parts = entry.split(';');
        let target = parts
            .next()
            .unwrap_or_default()
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim();
        if target.is_empty() {
            continue;
        }

        let mut tag = None;
        let mut internal = false;
        for param in parts {
            if let Some(v) = param_value(param, TAG_PARAM) {
                tag = Some(v);
            } else if param_value(param, REL_PARAM).is_some() {
                internal = true;
            }
        }

        if internal && tag.is_none() {
            continue;
        }

        links.push(Link::new(target, tag.unwrap_or_default()));
    }
}

/// Value of a `name="value"` link parameter, quotes removed
fn param_value<'a>(param: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = param.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case(name) {
        return None;
    }
    let value = value.trim();
    Some(
        value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value),
    )
}

fn format_link(link: &Link) -> String {
    if link.tag.is_empty() {
        format!("<{}>", link.link)
    } else {
        format!("<{}>; {}=\"{}\"", link.link, TAG_PARAM, link.tag)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader(format!("{:?}: {}", value, e)))
}

fn prefixed_name(prefix: &str, key: &str) -> Result<HeaderName> {
    // A bare prefix would not decode back to an entry
    if key.is_empty() {
        return Err(Error::InvalidHeader(format!("{}: empty key", prefix)));
    }
    let name = format!("{}{}", prefix, key);
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))
}

/// Encode metadata into request headers.
///
/// Emits `x-riak-vclock` when the vclock is set, a single `link` header
/// when at least one link exists, and one prefixed header per meta/index
/// entry. `content_type` is not emitted.
pub fn encode(metadata: &ObjectMetadata) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if !metadata.vclock.is_empty() {
        headers.insert(HeaderName::from_static(VCLOCK_HEADER), header_value(&metadata.vclock)?);
    }

    let links: Vec<String> = metadata
        .links
        .iter()
        .filter(|link| !link.link.is_empty())
        .map(format_link)
        .collect();
    if !links.is_empty() {
        headers.insert(LINK, header_value(&links.join(", "))?);
    }

    for (key, value) in &metadata.meta {
        headers.insert(prefixed_name(META_PREFIX, key)?, header_value(value)?);
    }
    for (key, value) in &metadata.index {
        headers.insert(prefixed_name(INDEX_PREFIX, key)?, header_value(value)?);
    }

    trace!(?headers, "encoded riak headers");
    Ok(headers)
}

/// Split a JSON document into Riak headers and the remaining document.
///
/// Top-level `vclock`, `links`, `meta` and `index` fields of an object
/// (matched case-insensitively) become headers and are absent from the
/// returned copy. Any other value comes back unchanged with no headers.
pub fn split_metadata(value: &Value) -> Result<(HeaderMap, Value)> {
    let Value::Object(fields) = value else {
        return Ok((HeaderMap::new(), value.clone()));
    };

    let mut metadata = ObjectMetadata::default();
    let mut remaining = Map::new();

    for (name, field) in fields {
        match name.to_ascii_lowercase().as_str() {
            "vclock" => metadata.vclock = scalar_to_string(field),
            "links" => metadata.links = links_from_json(field),
            "meta" => metadata.meta = pairs_from_json(field),
            "index" => metadata.index = pairs_from_json(field),
            _ => {
                remaining.insert(name.clone(), field.clone());
            }
        }
    }

    Ok((encode(&metadata)?, Value::Object(remaining)))
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn links_from_json(value: &Value) -> Vec<Link> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let link = item.get("link")?.as_str()?;
            let tag = item.get("tag").map(scalar_to_string).unwrap_or_default();
            Some(Link::new(link, tag))
        })
        .collect()
}

fn pairs_from_json(value: &Value) -> std::collections::BTreeMap<String, String> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), scalar_to_string(v)))
            .collect(),
        _ => Default::default(),
    }
}
