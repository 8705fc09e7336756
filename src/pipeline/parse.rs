//! Response parsing: recover the `products` array from a model reply.
//!
//! Models are asked for a bare JSON object, but replies still arrive wrapped
//! in prose ("Here is the JSON: …") or markdown fences. Parsing is therefore
//! best-effort and never fails:
//!
//! 1. parse the whole reply as JSON ([`ParsedResponse::Strict`]);
//! 2. otherwise parse the slice between the first `{` and the last `}`
//!    ([`ParsedResponse::Recovered`]);
//! 3. otherwise, or when the object has no `products` array, give up with
//!    [`ParsedResponse::Empty`].

use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of parsing one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// The reply was a JSON object as-is.
    Strict(Vec<Value>),
    /// The object was cut out of surrounding text.
    Recovered(Vec<Value>),
    /// Nothing usable; treated as zero products.
    Empty,
}

impl ParsedResponse {
    /// The raw product entries, whichever way they were found.
    pub fn products(&self) -> &[Value] {
        match self {
            ParsedResponse::Strict(p) | ParsedResponse::Recovered(p) => p,
            ParsedResponse::Empty => &[],
        }
    }

    pub fn into_products(self) -> Vec<Value> {
        match self {
            ParsedResponse::Strict(p) | ParsedResponse::Recovered(p) => p,
            ParsedResponse::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products().is_empty()
    }
}

/// Parse a model reply into its raw product entries.
pub fn parse_response(content: &str) -> ParsedResponse {
    let content = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return match products_of(value) {
            Some(products) => ParsedResponse::Strict(products),
            None => {
                warn!("Model reply is JSON but has no \"products\" array");
                ParsedResponse::Empty
            }
        };
    }

    let Some(candidate) = outermost_object(content) else {
        warn!("Model reply contains no JSON object ({} chars)", content.len());
        return ParsedResponse::Empty;
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => match products_of(value) {
            Some(products) => {
                debug!("Recovered JSON object from surrounding text");
                ParsedResponse::Recovered(products)
            }
            None => {
                warn!("Recovered JSON has no \"products\" array");
                ParsedResponse::Empty
            }
        },
        Err(e) => {
            warn!("Model reply is not valid JSON: {}", e);
            ParsedResponse::Empty
        }
    }
}

/// Slice from the first `{` to the last `}` inclusive, if they are ordered.
fn outermost_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

/// `products` must be an array on a top-level object; `null` counts as empty.
fn products_of(value: Value) -> Option<Vec<Value>> {
    let Value::Object(mut map) = value else {
        return None;
    };
    match map.remove("products")? {
        Value::Array(items) => Some(items),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}
