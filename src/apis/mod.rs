pub mod auth;
pub mod dynamic;
pub mod entities;
pub mod integrations;

// Re-export all APIs
pub use auth::AuthApi;
pub use dynamic::DynamicModule;
pub use entities::{EntitiesApi, EntityApi};
pub use integrations::{IntegrationPackage, IntegrationsApi};
