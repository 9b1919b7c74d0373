use crate::{
    error::DynRestResult,
    models::{Credentials, RequestDescriptor, ResponseBody},
    navigation::is_sign_in_path,
    transport::Transport,
};
use log::{debug, info, warn};
use reqwest::Method;
use serde_json::{json, Value};

/// Login/logout and session-token lifecycle
pub struct AuthApi<'a> {
    transport: &'a Transport,
    home_path: &'a str,
}

impl<'a> AuthApi<'a> {
    pub fn new(transport: &'a Transport, home_path: &'a str) -> Self {
        Self {
            transport,
            home_path,
        }
    }

    /// Current user
    pub async fn me(&self) -> DynRestResult<ResponseBody> {
        info!("Fetching current user");
        self.transport
            .execute(&RequestDescriptor::get("auth/me"))
            .await
    }

    /// Patch the current user
    ///
    /// # Arguments
    /// * `patch` - Fields to change on the user record
    pub async fn update_me(&self, patch: Value) -> DynRestResult<ResponseBody> {
        info!("Updating current user");
        let descriptor = RequestDescriptor::new(Method::PATCH, "auth/me").with_json(patch);
        self.transport.execute(&descriptor).await
    }

    /// Log in with `(email, password)` or a raw payload.
    ///
    /// A token found in the response is persisted as the session token.
    ///
    /// # Arguments
    /// * `credentials` - `(email, password)` tuple, [`Credentials`] or a JSON payload
    pub async fn login(&self, credentials: impl Into<Credentials>) -> DynRestResult<ResponseBody> {
        let credentials = credentials.into();
        info!("Logging in");
        let descriptor =
            RequestDescriptor::new(Method::POST, "auth/login").with_json(credentials.to_json());
        let response = self.transport.execute(&descriptor).await?;

        match response.as_json().and_then(extract_token) {
            Some(token) => {
                debug!("Login returned a session token");
                self.transport.session().set_token(Some(token), true)?;
            }
            None => warn!("Login response did not contain a token"),
        }
        Ok(response)
    }

    /// Best-effort server logout, then drop the local session and navigate away
    pub async fn logout(&self) {
        info!("Logging out");
        let descriptor = RequestDescriptor::new(Method::POST, "auth/logout");
        if let Err(e) = self.transport.execute(&descriptor).await {
            warn!("Logout request failed: {}", e);
        }

        self.transport.session().clear();

        let navigator = self.transport.navigator();
        let current = navigator.current_path().to_lowercase();
        let at_home = current == self.home_path.to_lowercase() || current == "/" || current.is_empty();
        if at_home {
            navigator.reload();
        } else {
            navigator.redirect(self.transport.login_url());
        }
    }

    /// Replace the session token
    ///
    /// # Arguments
    /// * `token` - New token, or `None` to drop it
    /// * `persist` - Also write the change to token storage
    pub fn set_token(&self, token: Option<&str>, persist: bool) -> DynRestResult<()> {
        self.transport
            .session()
            .set_token(token.map(str::to_string), persist)
    }

    /// Live check against `auth/me`; any failure means "not authenticated"
    pub async fn is_authenticated(&self) -> bool {
        match self.me().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Not authenticated: {}", e);
                false
            }
        }
    }

    /// Send the user to the login page, remembering where they were.
    /// Does nothing when already on it.
    pub fn navigate_to_login(&self) {
        let navigator = self.transport.navigator();
        let login_url = self.transport.login_url();
        let current = navigator.current_path();
        if is_sign_in_path(&current, login_url) {
            debug!("Already on the login page");
            return;
        }
        let location = format!("{}?redirect={}", login_url, urlencoding::encode(&current));
        navigator.redirect(&location);
    }

    /// Same as [`AuthApi::navigate_to_login`]
    pub fn redirect_to_login(&self) {
        self.navigate_to_login()
    }

    /// Any other auth operation: POST `auth/{name}` with a JSON body
    ///
    /// # Arguments
    /// * `name` - Operation name, used verbatim as the last path segment
    /// * `body` - JSON body; `None` sends `{}`
    pub async fn call(&self, name: &str, body: Option<Value>) -> DynRestResult<ResponseBody> {
        info!("Calling auth.{}", name);
        let descriptor = RequestDescriptor::new(Method::POST, format!("auth/{}", name))
            .with_json(body.unwrap_or_else(|| json!({})));
        self.transport.execute(&descriptor).await
    }
}

/// Token from a login response, trying the known response shapes in order
pub fn extract_token(response: &Value) -> Option<String> {
    ["/data/meta/access_token/token", "/token", "/data/token"]
        .iter()
        .filter_map(|pointer| response.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}
