//! Argument values and request body encoding.
//!
//! Dispatch never inspects runtime types: every argument is a [`Payload`], and
//! [`Payload::classify`] turns it into a [`PayloadShape`] that the API modules
//! match on. [`encode_body`] picks JSON or multipart for a payload.

use crate::{error::DynRestResult, models::RequestBody};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;

/// Binary content sent as a multipart file part
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlob {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FileBlob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk, naming the blob after the file
    pub async fn from_path(path: impl AsRef<Path>) -> DynRestResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let mut blob = Self::new(data);
        if let Some(name) = path.file_name() {
            blob.file_name = Some(name.to_string_lossy().into_owned());
        }
        Ok(blob)
    }
}

/// A single multipart field value
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text(String),
    File(FileBlob),
}

/// Ordered multipart form. Field order is preserved exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    entries: Vec<(String, FormPart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), FormPart::Text(value.into())));
    }

    pub fn append_file(&mut self, name: impl Into<String>, blob: FileBlob) {
        self.entries.push((name.into(), FormPart::File(blob)));
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_text(name, value);
        self
    }

    pub fn file(mut self, name: impl Into<String>, blob: FileBlob) -> Self {
        self.append_file(name, blob);
        self
    }

    pub fn entries(&self) -> &[(String, FormPart)] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// First field with the given name
    pub fn get(&self, name: &str) -> Option<&FormPart> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the reqwest multipart form for sending
    pub fn to_multipart(&self) -> DynRestResult<Form> {
        // field names go out as-is, like a browser form
        let mut form = Form::new().percent_encode_noop();
        for (name, part) in &self.entries {
            form = match part {
                FormPart::Text(text) => form.text(name.clone(), text.clone()),
                FormPart::File(blob) => {
                    let file_name = blob.file_name.clone().unwrap_or_else(|| "blob".to_string());
                    let mut file_part = Part::bytes(blob.data.to_vec()).file_name(file_name);
                    if let Some(content_type) = &blob.content_type {
                        file_part = file_part.mime_str(content_type)?;
                    }
                    form.part(name.clone(), file_part)
                }
            };
        }
        Ok(form)
    }
}

/// Argument value passed to a dynamic call
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    List(Vec<Payload>),
    /// Ordered mapping that may hold files
    Map(Vec<(String, Payload)>),
    File(FileBlob),
    Form(FormData),
}

/// Shape of a payload as seen by the dispatch rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Null,
    Scalar,
    List,
    /// A mapping with no file content anywhere inside
    PlainMap,
    /// A list or mapping with a file somewhere inside
    DeepFile,
    File,
    Form,
}

impl PayloadShape {
    /// Shapes that can travel as a request body
    pub fn is_body(self) -> bool {
        matches!(
            self,
            PayloadShape::PlainMap | PayloadShape::DeepFile | PayloadShape::File | PayloadShape::Form
        )
    }
}

impl Payload {
    pub fn null() -> Self {
        Payload::Json(Value::Null)
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Payload>,
    {
        Payload::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Payload>,
    {
        Payload::List(items.into_iter().map(Into::into).collect())
    }

    pub fn classify(&self) -> PayloadShape {
        match self {
            Payload::Form(_) => PayloadShape::Form,
            Payload::File(_) => PayloadShape::File,
            Payload::Json(Value::Null) => PayloadShape::Null,
            Payload::Json(Value::Object(_)) => PayloadShape::PlainMap,
            Payload::Json(Value::Array(_)) => PayloadShape::List,
            Payload::Json(_) => PayloadShape::Scalar,
            Payload::List(_) if self.has_file_deep() => PayloadShape::DeepFile,
            Payload::List(_) => PayloadShape::List,
            Payload::Map(_) if self.has_file_deep() => PayloadShape::DeepFile,
            Payload::Map(_) => PayloadShape::PlainMap,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Json(Value::Null))
    }

    /// True if this value is, or contains at any depth, a file or form
    pub fn has_file_deep(&self) -> bool {
        match self {
            Payload::File(_) | Payload::Form(_) => true,
            Payload::Json(_) => false,
            Payload::List(items) => items.iter().any(Payload::has_file_deep),
            Payload::Map(entries) => entries.iter().any(|(_, v)| v.has_file_deep()),
        }
    }

    /// JSON view of the payload; `None` when it holds file content
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Payload::Json(v) => Some(v.clone()),
            Payload::List(items) => items
                .iter()
                .map(Payload::to_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Payload::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_json()?);
                }
                Some(Value::Object(map))
            }
            Payload::File(_) | Payload::Form(_) => None,
        }
    }

    /// Text used when the payload appears as a URL path segment (not yet encoded)
    pub fn segment(&self) -> String {
        match self {
            Payload::Json(v) => query_string(v).unwrap_or_else(|| "null".to_string()),
            Payload::List(items) => items
                .iter()
                .map(Payload::segment)
                .collect::<Vec<_>>()
                .join(","),
            Payload::Map(_) => self.to_json().map(|v| v.to_string()).unwrap_or_default(),
            Payload::File(blob) => blob.file_name.clone().unwrap_or_default(),
            Payload::Form(_) => String::new(),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<FileBlob> for Payload {
    fn from(blob: FileBlob) -> Self {
        Payload::File(blob)
    }
}

impl From<FormData> for Payload {
    fn from(form: FormData) -> Self {
        Payload::Form(form)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Json(Value::String(s.to_string()))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Json(Value::String(s))
    }
}

/// Stringify a JSON value for a query string or form field. `None` for null.
pub fn query_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| query_string(v).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Choose the wire encoding for a payload.
///
/// Forms pass through, a lone file is wrapped under `file`, anything holding
/// files deeper down is flattened into bracketed form fields, and everything
/// else is JSON.
pub fn encode_body(payload: &Payload) -> RequestBody {
    match payload {
        Payload::Form(form) => RequestBody::Multipart(form.clone()),
        Payload::File(blob) => RequestBody::Multipart(FormData::new().file("file", blob.clone())),
        other => match other.to_json() {
            Some(json) => RequestBody::Json(json),
            None => RequestBody::Multipart(to_form_data(other)),
        },
    }
}

/// Flatten a payload into form fields named `parent[key]` / `parent[index]`
pub fn to_form_data(payload: &Payload) -> FormData {
    let mut form = FormData::new();
    flatten(payload, &mut form, None);
    form
}

fn child_key(ns: Option<&str>, key: &str) -> String {
    match ns {
        Some(ns) => format!("{}[{}]", ns, key),
        None => key.to_string(),
    }
}

fn flatten(payload: &Payload, form: &mut FormData, ns: Option<&str>) {
    match payload {
        Payload::Json(value) => flatten_json(value, form, ns),
        Payload::File(blob) => form.append_file(ns.unwrap_or("file"), blob.clone()),
        Payload::Form(inner) => {
            for (name, part) in inner.entries() {
                form.entries.push((child_key(ns, name), part.clone()));
            }
        }
        Payload::List(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(item, form, Some(&child_key(ns, &i.to_string())));
            }
        }
        Payload::Map(entries) => {
            for (k, v) in entries {
                flatten(v, form, Some(&child_key(ns, k)));
            }
        }
    }
}

fn flatten_json(value: &Value, form: &mut FormData, ns: Option<&str>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_json(item, form, Some(&child_key(ns, &i.to_string())));
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                flatten_json(v, form, Some(&child_key(ns, k)));
            }
        }
        scalar => {
            if let Some(text) = query_string(scalar) {
                form.append_text(ns.unwrap_or("value"), text);
            }
        }
    }
}
