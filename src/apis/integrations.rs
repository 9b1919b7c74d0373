use crate::{
    error::DynRestResult,
    models::{RequestBody, RequestDescriptor, ResponseBody},
    payload::{encode_body, Payload},
    transport::Transport,
};
use log::info;
use reqwest::Method;
use serde_json::json;

/// Integration packages, invoked as `integrations/{package}/{action}`
pub struct IntegrationsApi<'a> {
    transport: &'a Transport,
}

impl<'a> IntegrationsApi<'a> {
    pub fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub fn package(&self, name: impl Into<String>) -> IntegrationPackage<'a> {
        IntegrationPackage {
            transport: self.transport,
            name: name.into(),
        }
    }
}

/// Actions of one integration package
pub struct IntegrationPackage<'a> {
    transport: &'a Transport,
    name: String,
}

impl<'a> IntegrationPackage<'a> {
    /// Invoke an action. A null payload is sent as `{}`.
    ///
    /// # Arguments
    /// * `action` - Action name within the package
    /// * `data` - Action input; file content is sent as multipart
    pub async fn invoke(&self, action: &str, data: impl Into<Payload>) -> DynRestResult<ResponseBody> {
        info!("Invoking integration {}.{}", self.name, action);
        let descriptor = invoke_request(&self.name, action, &data.into());
        self.transport.execute(&descriptor).await
    }
}

pub fn invoke_request(package: &str, action: &str, data: &Payload) -> RequestDescriptor {
    let body = if data.is_null() {
        RequestBody::Json(json!({}))
    } else {
        encode_body(data)
    };
    RequestDescriptor::new(Method::POST, format!("integrations/{}/{}", package, action))
        .with_body(body)
}
