use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};
use utoipa::OpenApi;

use crate::api::rest::routes::{self, RecipesApiDoc};
use crate::config::RecipesConfig;
use crate::contract::client::RecipesApi;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::RecipesLocalClient;
use crate::infra::media::FsImageStore;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::sea_orm_repo::SeaOrmRecipesRepository;

/// The recipes module: wires storage, media and the domain service, and
/// exposes them as a REST router and an in-process client.
#[derive(Clone)]
pub struct RecipesModule {
    service: Arc<Service>,
    media_root: PathBuf,
    media_url: String,
}

impl RecipesModule {
    /// `media_root` must already be resolved against the server home dir.
    pub fn new(db: DatabaseConnection, cfg: RecipesConfig, media_root: PathBuf) -> Self {
        info!("Initializing recipes module");
        debug!(
            "Loaded recipes config: default_page_size={}, max_page_size={}, media_root={}",
            cfg.default_page_size,
            cfg.max_page_size,
            media_root.display()
        );

        let repo = SeaOrmRecipesRepository::new(db);
        let images = FsImageStore::new(media_root.clone(), &cfg.media_url);
        let service = Service::new(
            Arc::new(repo),
            Arc::new(images),
            ServiceConfig::from(&cfg),
        );

        Self {
            service: Arc::new(service),
            media_root,
            media_url: cfg.media_url,
        }
    }

    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running recipes database migrations");
        Migrator::up(db, None).await?;
        info!("Recipes database migrations completed successfully");
        Ok(())
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// Local in-process client for the CLI and other modules.
    pub fn client(&self) -> Arc<dyn RecipesApi> {
        Arc::new(RecipesLocalClient::new(self.service.clone()))
    }

    /// REST routes plus the stored media files.
    pub fn router(&self) -> Router {
        info!("Registering recipes REST routes");
        let router = routes::register_routes(Router::new(), self.service.clone());
        let prefix = self.media_url.trim_end_matches('/');
        if prefix.is_empty() {
            warn!("media_url is empty, uploaded images are not served");
            return router;
        }
        router.nest_service(prefix, ServeDir::new(&self.media_root))
    }

    pub fn openapi() -> utoipa::openapi::OpenApi {
        RecipesApiDoc::openapi()
    }
}
