use crate::{
    apis::{AuthApi, DynamicModule, EntitiesApi, IntegrationsApi},
    config::ClientConfig,
    error::DynRestResult,
    models::ConfigView,
    navigation::{MemoryNavigator, Navigator},
    session::Session,
    storage::{MemoryStorage, TokenStorage, LEGACY_TOKEN_KEY},
    transport::Transport,
};
use log::{debug, warn};
use reqwest::Client;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Main client.
///
/// Fixed modules are reached through accessors; any other namespace goes
/// through [`DynRestClient::module`], which creates a [`DynamicModule`] on
/// first use and caches it.
#[derive(Clone)]
pub struct DynRestClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<Transport>,
    service_role: ServiceRole,
    modules: ModuleCache,
}

impl DynRestClient {
    /// Create a client with in-memory storage and navigation
    pub fn new(config: ClientConfig) -> DynRestResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn entities(&self) -> EntitiesApi<'_> {
        EntitiesApi::new(&self.inner.transport)
    }

    pub fn integrations(&self) -> IntegrationsApi<'_> {
        IntegrationsApi::new(&self.inner.transport)
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(&self.inner.transport, &self.inner.config.home_path)
    }

    /// Module set bound to the service token instead of the user session
    pub fn as_service_role(&self) -> &ServiceRole {
        &self.inner.service_role
    }

    /// Dispatcher for an arbitrary namespace
    pub fn module(&self, namespace: &str) -> Arc<DynamicModule> {
        self.inner.modules.get_or_create(namespace, &self.inner.transport)
    }

    /// Set and persist the session token
    pub fn set_token(&self, token: &str) -> DynRestResult<()> {
        self.inner
            .transport
            .session()
            .set_token(Some(token.to_string()), true)
    }

    pub fn get_config(&self) -> ConfigView {
        ConfigView {
            server_url: self.inner.config.server_url.clone(),
        }
    }

    /// Remove the stale legacy token entry from storage
    pub fn cleanup(&self) {
        let storage = self.inner.transport.session().storage();
        if let Err(e) = storage.remove(LEGACY_TOKEN_KEY) {
            warn!("Failed to remove legacy token: {}", e);
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        self.inner.transport.session()
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }
}

/// Entities, integrations and dynamic modules running with their own token.
///
/// The service session lives in memory only and never touches the default
/// session or persisted storage.
pub struct ServiceRole {
    transport: Arc<Transport>,
    modules: ModuleCache,
}

impl ServiceRole {
    pub fn entities(&self) -> EntitiesApi<'_> {
        EntitiesApi::new(&self.transport)
    }

    pub fn integrations(&self) -> IntegrationsApi<'_> {
        IntegrationsApi::new(&self.transport)
    }

    pub fn module(&self, namespace: &str) -> Arc<DynamicModule> {
        self.modules.get_or_create(namespace, &self.transport)
    }

    pub fn session(&self) -> &Arc<Session> {
        self.transport.session()
    }

    /// Nothing is persisted for the service role
    pub fn cleanup(&self) {}
}

#[derive(Default)]
struct ModuleCache {
    modules: Mutex<HashMap<String, Arc<DynamicModule>>>,
}

impl ModuleCache {
    fn get_or_create(&self, namespace: &str, transport: &Arc<Transport>) -> Arc<DynamicModule> {
        let mut modules = match self.modules.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        modules
            .entry(namespace.to_string())
            .or_insert_with(|| {
                debug!("Creating dynamic module {}", namespace);
                Arc::new(DynamicModule::new(namespace, transport.clone()))
            })
            .clone()
    }
}

/// Builder for [`DynRestClient`]
pub struct ClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn TokenStorage>>,
    navigator: Option<Arc<dyn Navigator>>,
    http_client: Option<Client>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            storage: None,
            navigator: None,
            http_client: None,
        }
    }

    /// Persistent token storage; defaults to [`MemoryStorage`]
    pub fn storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Redirect policy; defaults to a [`MemoryNavigator`] at the home path
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Custom reqwest client, e.g. with timeouts or a proxy
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validate the configuration and assemble the client. Fails before any
    /// network activity when `server_url` is missing.
    pub fn build(self) -> DynRestResult<DynRestClient> {
        let config = self.config;
        let base_url = config.base_url()?;

        let client = match self.http_client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(concat!(
                    env!("CARGO_PKG_NAME"),
                    "/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build()?,
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(MemoryNavigator::new(config.home_path.clone())));

        let session = Arc::new(Session::new(
            config.token.clone(),
            storage,
            config.storage_key.clone(),
        ));
        let transport = Transport::new(client, base_url, session, navigator, config.login_url.clone());

        let service_session = Arc::new(Session::new(
            config.service_token.clone().or_else(|| config.token.clone()),
            Arc::new(MemoryStorage::new()),
            config.storage_key.clone(),
        ));
        let service_role = ServiceRole {
            transport: Arc::new(transport.with_session(service_session)),
            modules: ModuleCache::default(),
        };
        debug!("Client ready for {}", transport.base_url());

        Ok(DynRestClient {
            inner: Arc::new(ClientInner {
                config,
                transport: Arc::new(transport),
                service_role,
                modules: ModuleCache::default(),
            }),
        })
    }
}
