pub mod api;
pub mod catalog_service;
pub mod catalog_store;
pub mod clock;
pub mod identifiers;
pub mod notice;
pub mod settings;
pub mod telemetry;

#[cfg(any(feature = "client", test))]
pub mod client;

#[cfg(any(feature = "server", test))]
pub mod app_config;

#[cfg(any(feature = "server", test))]
mod handlers;

#[cfg(any(feature = "server", test))]
pub use handlers::SharedCatalog;
