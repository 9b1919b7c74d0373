use crate::{
    error::{DynRestError, DynRestResult},
    payload::{query_string, FormData},
};
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Fully resolved request, built by an API module and handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the server URL, without a leading slash
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(FormData),
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Request with an already encoded body; JSON bodies get their content type here
    pub fn with_body(mut self, body: RequestBody) -> Self {
        if matches!(body, RequestBody::Json(_)) {
            self.headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        self.body = body;
        self
    }

    pub fn with_json(self, value: Value) -> Self {
        self.with_body(RequestBody::Json(value))
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Header value set on this request, last one wins
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// HTTP 204
    NoContent,
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Deserialize a JSON body into a typed model
    pub fn deserialize<T: DeserializeOwned>(self) -> DynRestResult<T> {
        match self {
            Self::Json(v) => Ok(serde_json::from_value(v)?),
            Self::Text(t) => Ok(serde_json::from_str(&t)?),
            Self::NoContent => Err(DynRestError::request_failed(
                204,
                "Expected a response body but got no content",
            )),
        }
    }
}

/// Options for listing an entity collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListOptions {
    pub sort: Option<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub fields: Option<Vec<String>>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Read sort/limit/skip/fields out of a loose JSON object.
    /// `fields` may be a string or an array of strings.
    pub fn from_json(value: &Value) -> Self {
        let fields = match value.get("fields") {
            Some(Value::String(s)) => Some(vec![s.clone()]),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        };
        Self {
            sort: value.get("sort").and_then(Value::as_str).map(str::to_string),
            limit: value.get("limit").and_then(Value::as_u64),
            skip: value.get("skip").and_then(Value::as_u64),
            fields,
        }
    }

    /// Query pairs in `sort, limit, skip, fields` order, unset options omitted
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(sort) = &self.sort {
            query.push(("sort".to_string(), sort.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(skip) = self.skip {
            query.push(("skip".to_string(), skip.to_string()));
        }
        if let Some(fields) = &self.fields {
            query.push(("fields".to_string(), fields.join(",")));
        }
        query
    }
}

/// Options for filtering an entity collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    /// Filter document, sent JSON-encoded as `q`
    pub query: Value,
    pub list: ListOptions,
}

impl FilterOptions {
    pub fn new(query: Value) -> Self {
        Self {
            query,
            list: ListOptions::default(),
        }
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.list = self.list.sort(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.list = self.list.limit(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.list = self.list.skip(skip);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list = self.list.fields(fields);
        self
    }

    pub fn to_query(&self) -> DynRestResult<Vec<(String, String)>> {
        let filter = if self.query.is_null() {
            Value::Object(Default::default())
        } else {
            self.query.clone()
        };
        let mut query = vec![("q".to_string(), serde_json::to_string(&filter)?)];
        query.extend(self.list.to_query());
        Ok(query)
    }
}

/// A loose options object: an explicit `q` key is the filter, otherwise the
/// whole object is. Paging keys are read from the same object.
impl From<Value> for FilterOptions {
    fn from(value: Value) -> Self {
        let list = ListOptions::from_json(&value);
        let query = match value {
            Value::Object(mut map) if map.contains_key("q") => {
                map.remove("q").unwrap_or(Value::Null)
            }
            other => other,
        };
        Self { query, list }
    }
}

/// Login credentials: positional email/password or a raw payload
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    Password {
        email: String,
        password: String,
        turnstile_token: Option<String>,
    },
    Payload(Value),
}

impl Credentials {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            email: email.into(),
            password: password.into(),
            turnstile_token: None,
        }
    }

    pub fn with_turnstile_token(self, token: impl Into<String>) -> Self {
        match self {
            Self::Password { email, password, .. } => Self::Password {
                email,
                password,
                turnstile_token: Some(token.into()),
            },
            other => other,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Password {
                email,
                password,
                turnstile_token,
            } => {
                let mut body = serde_json::json!({ "email": email, "password": password });
                if let Some(token) = turnstile_token {
                    body["turnstile_token"] = Value::String(token.clone());
                }
                body
            }
            Self::Payload(v) => v.clone(),
        }
    }
}

impl From<(&str, &str)> for Credentials {
    fn from((email, password): (&str, &str)) -> Self {
        Self::password(email, password)
    }
}

impl From<Value> for Credentials {
    fn from(value: Value) -> Self {
        Self::Payload(value)
    }
}

/// Public view of the client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub server_url: String,
}

/// Query pairs for an arbitrary JSON object, null values dropped
pub fn json_query(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| query_string(v).map(|s| (k.clone(), s)))
            .collect(),
        _ => Vec::new(),
    }
}
