use std::sync::Arc;

use crate::config::RecipesConfig;
use crate::contract::model::{Page, PageRequest};
use crate::domain::error::DomainError;
use crate::domain::ports::ImageStore;
use crate::domain::repo::RecipesRepository;

mod catalog;
mod recipes;
mod relations;
mod shopping;
mod users;

/// Largest value accepted for SQL `LIMIT`/`OFFSET` binds.
const MAX_SQL_INT: u64 = i64::MAX as u64;

/// Domain service with business rules for users, recipes and their relations.
/// Depends only on the repository and image-store ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn RecipesRepository>,
    images: Arc<dyn ImageStore>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub max_recipe_name_length: usize,
    pub shopping_list_title: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&RecipesConfig::default())
    }
}

impl From<&RecipesConfig> for ServiceConfig {
    fn from(cfg: &RecipesConfig) -> Self {
        Self {
            default_page_size: cfg.default_page_size.max(1),
            max_page_size: cfg.max_page_size.max(1),
            max_recipe_name_length: cfg.max_recipe_name_length,
            shopping_list_title: cfg.shopping_list_title.clone(),
        }
    }
}

impl ServiceConfig {
    /// Resolve a requested page. Offsets the database cannot bind are past
    /// the end of any result set.
    pub(crate) fn page_window(&self, req: PageRequest) -> Result<PageWindow, DomainError> {
        let limit = req
            .limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let page = req.page.unwrap_or(1).max(1);
        let offset = (page - 1)
            .checked_mul(limit)
            .filter(|offset| *offset <= MAX_SQL_INT)
            .ok_or(DomainError::PageNotFound)?;
        Ok(PageWindow {
            page,
            limit,
            offset,
        })
    }

    /// Cap a caller-supplied preview size at what the database can bind.
    pub(crate) fn preview_limit(&self, limit: Option<u64>) -> Option<u64> {
        limit.map(|l| l.min(MAX_SQL_INT))
    }
}

/// Resolved window of a paginated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageWindow {
    pub page: u64,
    pub limit: u64,
    pub offset: u64,
}

impl PageWindow {
    /// Wrap fetched items, rejecting pages past the end (the first page always exists).
    pub fn into_page<T>(self, items: Vec<T>, total: u64) -> Result<Page<T>, DomainError> {
        if self.page > 1 && self.offset >= total {
            return Err(DomainError::PageNotFound);
        }
        Ok(Page {
            items,
            total,
            page: self.page,
            limit: self.limit,
        })
    }
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(
        repo: Arc<dyn RecipesRepository>,
        images: Arc<dyn ImageStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            images,
            config,
        }
    }

    /// Public URL of a stored image path.
    pub fn image_url(&self, path: &str) -> String {
        self.images.url_for(path)
    }
}
