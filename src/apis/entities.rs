use crate::{
    error::DynRestResult,
    models::{json_query, FilterOptions, ListOptions, RequestBody, RequestDescriptor, ResponseBody},
    payload::{encode_body, to_form_data, Payload},
    transport::Transport,
};
use log::info;
use reqwest::Method;
use serde_json::{json, Value};

/// Entry point for named entity collections
pub struct EntitiesApi<'a> {
    transport: &'a Transport,
}

impl<'a> EntitiesApi<'a> {
    pub fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// CRUD operations for the entity collection `name`.
    ///
    /// No registry is consulted; an unknown entity only shows up as an HTTP
    /// error from the server.
    pub fn entity(&self, name: impl Into<String>) -> EntityApi<'a> {
        EntityApi {
            transport: self.transport,
            name: name.into(),
        }
    }
}

/// Entity collection operations
pub struct EntityApi<'a> {
    transport: &'a Transport,
    name: String,
}

impl<'a> EntityApi<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, descriptor: RequestDescriptor) -> DynRestResult<ResponseBody> {
        self.transport.execute(&descriptor).await
    }

    /// List entities
    pub async fn list(&self, options: ListOptions) -> DynRestResult<ResponseBody> {
        info!("Listing {}", self.name);
        self.send(list_request(&self.name, &options)).await
    }

    /// Filter entities; the filter document travels JSON-encoded as `q`
    ///
    /// # Arguments
    /// * `options` - [`FilterOptions`], or a JSON object whose `q` key (or the
    ///   whole object) is the filter and whose `sort`/`limit`/`skip`/`fields`
    ///   keys page the result
    pub async fn filter(&self, options: impl Into<FilterOptions>) -> DynRestResult<ResponseBody> {
        info!("Filtering {}", self.name);
        self.send(filter_request(&self.name, &options.into())?).await
    }

    /// Get a single entity
    ///
    /// # Arguments
    /// * `id` - Entity id, URL-encoded into the path
    pub async fn get(&self, id: &str) -> DynRestResult<ResponseBody> {
        info!("Getting {} {}", self.name, id);
        self.send(get_request(&self.name, id)).await
    }

    /// Create an entity; file content switches the body to multipart
    pub async fn create(&self, data: impl Into<Payload>) -> DynRestResult<ResponseBody> {
        info!("Creating {}", self.name);
        self.send(create_request(&self.name, &data.into())).await
    }

    /// Replace an entity; file content switches the body to multipart
    ///
    /// # Arguments
    /// * `id` - Entity id
    /// * `data` - New field values
    pub async fn update(&self, id: &str, data: impl Into<Payload>) -> DynRestResult<ResponseBody> {
        info!("Updating {} {}", self.name, id);
        self.send(update_request(&self.name, id, &data.into())).await
    }

    pub async fn delete(&self, id: &str) -> DynRestResult<ResponseBody> {
        info!("Deleting {} {}", self.name, id);
        self.send(delete_request(&self.name, id)).await
    }

    /// Delete every entity matching `query`
    ///
    /// # Arguments
    /// * `query` - Filter document, sent as `{"query": ...}`
    pub async fn delete_many(&self, query: Value) -> DynRestResult<ResponseBody> {
        info!("Deleting many {}", self.name);
        self.send(delete_many_request(&self.name, query)).await
    }

    pub async fn bulk_create(&self, data: impl Into<Payload>) -> DynRestResult<ResponseBody> {
        info!("Bulk creating {}", self.name);
        self.send(bulk_create_request(&self.name, &data.into())).await
    }

    /// Upload an import file; always multipart
    pub async fn import_entities(&self, file: impl Into<Payload>) -> DynRestResult<ResponseBody> {
        info!("Importing {}", self.name);
        self.send(import_request(&self.name, &file.into())).await
    }

    /// Call an operation by name. Unknown names list the collection with the
    /// first argument as query.
    pub async fn call(&self, method: &str, args: Vec<Payload>) -> DynRestResult<ResponseBody> {
        info!("Calling {}.{}", self.name, method);
        self.send(entity_request(&self.name, method, &args)?).await
    }
}

fn entity_path(entity: &str, id: &str) -> String {
    format!("{}/{}", entity, urlencoding::encode(id))
}

pub fn list_request(entity: &str, options: &ListOptions) -> RequestDescriptor {
    RequestDescriptor::get(entity).with_query(options.to_query())
}

pub fn filter_request(entity: &str, options: &FilterOptions) -> DynRestResult<RequestDescriptor> {
    Ok(RequestDescriptor::get(entity).with_query(options.to_query()?))
}

pub fn get_request(entity: &str, id: &str) -> RequestDescriptor {
    RequestDescriptor::get(entity_path(entity, id))
}

pub fn create_request(entity: &str, data: &Payload) -> RequestDescriptor {
    RequestDescriptor::new(Method::POST, entity).with_body(encode_body(data))
}

pub fn update_request(entity: &str, id: &str, data: &Payload) -> RequestDescriptor {
    RequestDescriptor::new(Method::PUT, entity_path(entity, id)).with_body(encode_body(data))
}

pub fn delete_request(entity: &str, id: &str) -> RequestDescriptor {
    RequestDescriptor::new(Method::DELETE, entity_path(entity, id))
}

pub fn delete_many_request(entity: &str, query: Value) -> RequestDescriptor {
    RequestDescriptor::new(Method::POST, format!("{}/deleteMany", entity))
        .with_json(json!({ "query": query }))
}

pub fn bulk_create_request(entity: &str, data: &Payload) -> RequestDescriptor {
    let body = match data {
        Payload::Form(form) => RequestBody::Multipart(form.clone()),
        other => encode_body(&Payload::map([("data", other.clone())])),
    };
    RequestDescriptor::new(Method::POST, format!("{}/bulk", entity)).with_body(body)
}

pub fn import_request(entity: &str, file: &Payload) -> RequestDescriptor {
    let form = to_form_data(&Payload::map([("file", file.clone())]));
    RequestDescriptor::new(Method::POST, format!("{}/import", entity))
        .with_body(RequestBody::Multipart(form))
}

/// Resolve an operation name and positional arguments to a request
pub fn entity_request(
    entity: &str,
    method: &str,
    args: &[Payload],
) -> DynRestResult<RequestDescriptor> {
    let null = Payload::null();
    let arg = |i: usize| args.get(i).unwrap_or(&null);
    let json_arg = |i: usize| arg(i).to_json().unwrap_or(Value::Null);

    Ok(match method {
        "list" => list_request(entity, &ListOptions::from_json(&json_arg(0))),
        "filter" => filter_request(entity, &FilterOptions::from(json_arg(0)))?,
        "get" => get_request(entity, &arg(0).segment()),
        "create" => create_request(entity, arg(0)),
        "update" => update_request(entity, &arg(0).segment(), arg(1)),
        "delete" => delete_request(entity, &arg(0).segment()),
        "deleteMany" | "delete_many" => delete_many_request(entity, json_arg(0)),
        "bulkCreate" | "bulk_create" => bulk_create_request(entity, arg(0)),
        "importEntities" | "import_entities" => import_request(entity, arg(0)),
        _ => RequestDescriptor::get(entity).with_query(json_query(&json_arg(0))),
    })
}
