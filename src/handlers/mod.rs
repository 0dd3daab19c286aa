pub mod bom;
pub mod common;
pub mod items;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{bom::BomService, items::ItemService},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub items: Arc<ItemService>,
    pub bom: Arc<BomService>,
}

impl AppServices {
    /// Wires both registries against one pool, applying the configured
    /// retry limit and default listing order.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let sort = config.sort_order();
        let items = ItemService::new(db_pool.clone()).with_policy(config.create_retry_limit, sort);
        let bom = BomService::new(db_pool, items.clone()).with_default_sort(sort);

        Self {
            items: Arc::new(items),
            bom: Arc::new(bom),
        }
    }
}
