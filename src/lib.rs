/*
 * Dynamic REST client - maps namespace/method calls onto a REST backend
 */

// Internal modules
mod client;
pub mod config;
pub mod models;
pub mod apis;
mod error;
pub mod navigation;
pub mod payload;
pub mod report;
mod session;
pub mod storage;
mod transport;

// Re-export public types and interfaces
pub use client::{ClientBuilder, DynRestClient, ServiceRole};
pub use config::ClientConfig;
pub use models::*;
pub use apis::*;
pub use error::{DynRestError, DynRestResult};
pub use navigation::{MemoryNavigator, Navigation, Navigator};
pub use payload::{FileBlob, FormData, FormPart, Payload, PayloadShape};
pub use session::Session;
pub use storage::{FileStorage, MemoryStorage, TokenStorage};
pub use transport::Transport;

// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DynRestClient, ClientConfig,
        DynRestError, DynRestResult,
        MemoryNavigator, Navigator,
        MemoryStorage, FileStorage, TokenStorage,
        // Common model types
        Credentials, FilterOptions, ListOptions, ResponseBody,
        FileBlob, FormData, Payload,
    };
}
