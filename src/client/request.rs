use std::fmt;

use http::Method;
use serde_json::Value;

/// Accept types the API can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Json,
    Protobuf,
    XGoogleProtobuf,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Protobuf => "application/protobuf",
            ContentType::XGoogleProtobuf => "application/x-google-protobuf",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Scalar(String),
    List(Vec<String>),
}

/// Ordered query parameters. Setting a key twice replaces the first value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, QueryValue::Scalar(value.to_string()));
        self
    }

    pub fn opt_scalar<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.scalar(key, v),
            None => self,
        }
    }

    pub fn list<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let values: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        self.set(key, QueryValue::List(values));
        self
    }

    /// Skips the key for `None` and for an empty list.
    pub fn opt_list<V: ToString>(self, key: &str, values: Option<&[V]>) -> Self {
        match values {
            Some(values) if !values.is_empty() => self.list(key, values.iter().map(|v| v.to_string())),
            _ => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten to wire pairs; a list becomes one pair per element.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            match value {
                QueryValue::Scalar(v) => pairs.push((key.clone(), v.clone())),
                QueryValue::List(values) => {
                    pairs.extend(values.iter().map(|v| (key.clone(), v.clone())));
                }
            }
        }
        pairs
    }

    fn set(&mut self, key: &str, value: QueryValue) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_owned(), value)),
        }
    }
}

/// Everything needed to send one call, fixed before the first attempt.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub query: QueryParams,
    pub payload: Option<Value>,
    pub accept: ContentType,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>, accept: ContentType) -> Self {
        Self {
            method,
            url: url.into(),
            query: QueryParams::default(),
            payload: None,
            accept,
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = payload;
        self
    }
}

/// Decoded response: parsed JSON for a JSON accept, raw bytes otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Bytes(Vec<u8>),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Bytes(b) => Some(b),
        }
    }
}
