use crate::{
    error::{DynRestError, DynRestResult},
    models::{RequestBody, RequestDescriptor, ResponseBody},
    navigation::{is_sign_in_path, Navigator},
    session::Session,
};
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, RequestBuilder, Response, StatusCode,
};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// HTTP transport: turns a [`RequestDescriptor`] into a network call and
/// classifies the response.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: Url,
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
    login_url: String,
}

impl Transport {
    /// `base_url` must already end with `/`
    pub fn new(
        client: Client,
        base_url: Url,
        session: Arc<Session>,
        navigator: Arc<dyn Navigator>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            session,
            navigator,
            login_url: login_url.into(),
        }
    }

    /// Same server and navigator, different session
    pub fn with_session(&self, session: Arc<Session>) -> Self {
        Self {
            session,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Resolve `path` against the base URL and append the query
    pub fn build_url(&self, path: &str, query: &[(String, String)]) -> DynRestResult<Url> {
        // "./" keeps names like "a:b" from being read as a URL scheme
        let mut url = self.base_url.join(&format!("./{}", path.trim_start_matches('/')))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Build the reqwest request with default headers and authentication
    fn request(&self, descriptor: &RequestDescriptor) -> DynRestResult<RequestBuilder> {
        let url = self.build_url(&descriptor.path, &descriptor.query)?;
        debug!("HTTP {} {}", descriptor.method, url);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        self.session.apply_auth(&mut headers)?;

        // caller-supplied headers win
        for (name, value) in &descriptor.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DynRestError::InvalidHeader(format!("{}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| DynRestError::InvalidHeader(format!("{}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let request = self
            .client
            .request(descriptor.method.clone(), url)
            .headers(headers);

        Ok(match &descriptor.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => {
                debug!("Request body: {}", redacted(value));
                request.body(serde_json::to_vec(value)?)
            }
            RequestBody::Multipart(form) => {
                debug!("Multipart fields: {:?}", form.names());
                request.multipart(form.to_multipart()?)
            }
        })
    }

    /// Execute a request and classify the response
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> DynRestResult<ResponseBody> {
        let request = self.request(descriptor)?;
        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> DynRestResult<ResponseBody> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(ResponseBody::NoContent);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let text = response.text().await?;
        let data = parse_body(&content_type, text);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.handle_unauthorized(status);
            return Err(DynRestError::Unauthorized {
                status: status.as_u16(),
                data,
            });
        }

        if !status.is_success() {
            return Err(classify_failure(status, &content_type, data));
        }

        Ok(data)
    }

    /// Forced logout: drop the session and send the user to sign in
    fn handle_unauthorized(&self, status: StatusCode) {
        warn!("Unauthorized ({}), clearing session", status.as_u16());
        self.session.clear();

        let current = self.navigator.current_path();
        if !is_sign_in_path(&current, &self.login_url) {
            self.navigator.redirect(&self.login_url);
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .field("session", &self.session)
            .finish()
    }
}

fn looks_json(content_type: &str) -> bool {
    content_type.contains("application/json") || content_type.contains("application/problem+json")
}

/// JSON content types are parsed; a parse failure keeps the raw text
fn parse_body(content_type: &str, text: String) -> ResponseBody {
    if looks_json(content_type) {
        if let Ok(value) = serde_json::from_str(&text) {
            return ResponseBody::Json(value);
        }
    }
    ResponseBody::Text(text)
}

/// Error for a non-2xx, non-auth response.
///
/// Message precedence: problem+json `title`, JSON `message`, status line.
fn classify_failure(status: StatusCode, content_type: &str, data: ResponseBody) -> DynRestError {
    let problem = content_type.contains("application/problem+json");
    let json = data.as_json();
    let field = |name: &str| json.and_then(|j| j.get(name));

    let message = field("title")
        .filter(|_| problem)
        .and_then(|v| v.as_str())
        .or_else(|| field("message").and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or(""))
                .trim()
                .to_string()
        });

    let status_code = field(if problem { "status" } else { "statusCode" })
        .and_then(|v| v.as_u64())
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(status.as_u16());
    let code = field("type").and_then(|v| v.as_str()).map(str::to_string);

    DynRestError::RequestFailed {
        status: status_code,
        message,
        code,
        data,
    }
}

const SENSITIVE_KEYS: [&str; 3] = ["password", "token", "secret"];

/// Copy of `value` with credential-looking fields masked, for logging only
fn redacted(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let key = k.to_ascii_lowercase();
                    if SENSITIVE_KEYS.iter().any(|s| key.contains(s)) {
                        (k.clone(), Value::String("***".to_string()))
                    } else {
                        (k.clone(), redacted(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redacted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{navigation::MemoryNavigator, storage::MemoryStorage};
    use serde_json::json;

    fn transport(base: &str) -> Transport {
        let session = Arc::new(Session::new(None, Arc::new(MemoryStorage::new()), "tok"));
        Transport::new(
            Client::new(),
            Url::parse(base).unwrap(),
            session,
            Arc::new(MemoryNavigator::default()),
            "/signin",
        )
    }

    #[test]
    fn redacted_masks_credentials_at_any_depth() {
        let body = json!({
            "email": "a@b.c",
            "password": "hunter2",
            "data": [{"refresh_token": "r", "name": "x"}],
            "clientSecret": "s"
        });
        assert_eq!(
            redacted(&body),
            json!({
                "email": "a@b.c",
                "password": "***",
                "data": [{"refresh_token": "***", "name": "x"}],
                "clientSecret": "***"
            })
        );
    }

    #[test]
    fn build_url_appends_query_in_order() {
        let t = transport("http://api.test/v1/");
        let url = t
            .build_url(
                "Todo",
                &[("sort".into(), "-created".into()), ("limit".into(), "5".into())],
            )
            .unwrap();
        assert_eq!(url.as_str(), "http://api.test/v1/Todo?sort=-created&limit=5");
    }

    #[test]
    fn build_url_without_query_has_no_question_mark() {
        let t = transport("http://api.test/");
        assert_eq!(t.build_url("auth/me", &[]).unwrap().as_str(), "http://api.test/auth/me");
    }

    #[test]
    fn build_url_keeps_colon_names_relative() {
        let t = transport("http://api.test/api/");
        let url = t.build_url("ns:item/run", &[]).unwrap();
        assert_eq!(url.as_str(), "http://api.test/api/ns:item/run");
    }

    #[test]
    fn malformed_json_degrades_to_text() {
        assert_eq!(
            parse_body("application/json", "{not json".into()),
            ResponseBody::Text("{not json".into())
        );
        assert_eq!(
            parse_body("application/problem+json; charset=utf-8", "{\"a\":1}".into()),
            ResponseBody::Json(json!({"a": 1}))
        );
        assert_eq!(parse_body("text/plain", "{}".into()), ResponseBody::Text("{}".into()));
    }

    #[test]
    fn failure_message_precedence() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            "application/problem+json",
            ResponseBody::Json(json!({"title": "Invalid", "message": "ignored", "type": "about:blank"})),
        );
        assert_eq!(err.to_string(), "Invalid");
        assert_eq!(err.code(), Some("about:blank"));

        let err = classify_failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "application/json",
            ResponseBody::Json(json!({"title": "not used", "message": "Bad field", "statusCode": 409})),
        );
        assert_eq!(err.to_string(), "Bad field");
        assert_eq!(err.status(), Some(409));

        let err = classify_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/html",
            ResponseBody::Text("<h1>oops</h1>".into()),
        );
        assert_eq!(err.to_string(), "HTTP 500 Internal Server Error");
        assert_eq!(err.status(), Some(500));
    }
}
