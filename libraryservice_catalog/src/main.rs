use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use paperclip::actix::{OpenApiExt, web};
use parking_lot::Mutex;
use tracing_actix_web::TracingLogger;

use libraryservice_catalog::app_config::config_app;
use libraryservice_catalog::catalog_service::LibraryCatalogService;
use libraryservice_catalog::catalog_store::{
    CatalogStore, FileCatalogStore, InMemoryCatalogStore,
};
use libraryservice_catalog::settings::Settings;
use libraryservice_catalog::telemetry::init_telemetry;
use libraryservice_catalog::SharedCatalog;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_telemetry("libraryservice_catalog", &settings.log_filter)?;

    let store: Arc<dyn CatalogStore> = if settings.use_in_memory_store {
        tracing::warn!("Using in-memory catalog store, nothing will survive a restart");
        Arc::new(InMemoryCatalogStore::default())
    } else {
        Arc::new(
            FileCatalogStore::new(&settings.data_dir)
                .context("Failed to open catalog data directory")?,
        )
    };
    let catalog: SharedCatalog = Arc::new(Mutex::new(LibraryCatalogService::with_system_clock(
        store,
    )));

    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.host,
        settings.port
    );
    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(catalog.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.host.as_str(), settings.port))
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server failed")
}
