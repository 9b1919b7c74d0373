//! Catch-all dispatcher for namespaces the SDK does not know about.
//!
//! `N.M(args..)` resolves to a request purely from the method name and the
//! shape of the arguments, so new server-side namespaces need no code here.

use crate::{
    error::DynRestResult,
    models::{json_query, RequestDescriptor, ResponseBody},
    payload::{encode_body, Payload, PayloadShape},
    transport::Transport,
};
use log::info;
use reqwest::Method;
use std::sync::Arc;

/// Method names that are always reads
pub const GET_METHODS: [&str; 4] = ["list", "filter", "search", "count"];

/// Dispatcher bound to one namespace
#[derive(Debug, Clone)]
pub struct DynamicModule {
    namespace: String,
    transport: Arc<Transport>,
}

impl DynamicModule {
    pub fn new(namespace: impl Into<String>, transport: Arc<Transport>) -> Self {
        Self {
            namespace: namespace.into(),
            transport,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Call `method` with positional arguments
    ///
    /// # Arguments
    /// * `method` - Method name, the last path segment
    /// * `args` - Path parameters followed by an optional query or body
    pub async fn call(&self, method: &str, args: Vec<Payload>) -> DynRestResult<ResponseBody> {
        info!("Calling {}.{}", self.namespace, method);
        let descriptor = dispatch(&self.namespace, method, &args);
        self.transport.execute(&descriptor).await
    }
}

/// Resolve a dynamic call to a request.
///
/// Read methods take a trailing mapping as the query. Everything else takes a
/// trailing body-shaped argument (mapping, file or form) as the body and
/// degrades to a bare GET when there is none. A read method whose trailing
/// argument carries files is sent like any other method, as a multipart POST.
/// Remaining arguments become path segments: `N/p1/../pn/M`; empty segments
/// are skipped.
pub fn dispatch(namespace: &str, method: &str, args: &[Payload]) -> RequestDescriptor {
    let carries_files = args.last().map_or(false, |last| {
        matches!(
            last.classify(),
            PayloadShape::File | PayloadShape::DeepFile | PayloadShape::Form
        )
    });
    if GET_METHODS.contains(&method) && !carries_files {
        let (query, params) = match args.split_last() {
            Some((last, rest)) if last.classify() == PayloadShape::PlainMap => {
                let query = last.to_json().map(|v| json_query(&v)).unwrap_or_default();
                (query, rest)
            }
            _ => (Vec::new(), args),
        };
        return RequestDescriptor::get(build_path(namespace, params, method)).with_query(query);
    }

    let (body, params) = match args.split_last() {
        Some((last, rest)) if last.classify().is_body() => (Some(last), rest),
        _ => (None, args),
    };
    let path = build_path(namespace, params, method);

    match body {
        Some(body) => RequestDescriptor::new(Method::POST, path).with_body(encode_body(body)),
        None => RequestDescriptor::get(path),
    }
}

fn build_path(namespace: &str, params: &[Payload], method: &str) -> String {
    let mut path = namespace.to_string();
    for segment in params.iter().map(Payload::segment) {
        if segment.is_empty() {
            continue;
        }
        path.push('/');
        path.push_str(&urlencoding::encode(&segment));
    }
    path.push('/');
    path.push_str(&urlencoding::encode(method));
    path
}
