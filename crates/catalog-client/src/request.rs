use serde_json::Value;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn to_http(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as `application/json`.
    Json(Value),
    /// Serialized as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Sent as-is with no `Content-Type`; the payload negotiates for itself.
    Raw(Vec<u8>),
}

impl RequestBody {
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Json(_) => Some("application/json"),
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
            Self::Raw(_) => None,
        }
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Form(pairs) => encode_form(pairs).into_bytes(),
            Self::Raw(bytes) => bytes.clone(),
        }
    }
}

fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Everything needed to issue one API call. Built once, never mutated: the
/// executor clones what it needs when it resends with a fresh credential.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    endpoint: String,
    method: Method,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl RequestDescriptor {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Patch, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// Adds a query parameter. Values that render empty are omitted.
    pub fn param(mut self, key: &str, value: impl Display) -> Self {
        let value = value.to_string();
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.query.push((key.to_string(), trimmed.to_string()));
        }
        self
    }

    /// Adds a query parameter when present; `None` is omitted.
    pub fn opt_param<T: Display>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    pub fn raw(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Raw(bytes));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}
