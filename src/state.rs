//! Shared application state injected into every handler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::application::services::analytics_service::DEFAULT_ANALYTICS_TTL;
use crate::application::services::link_service::DEFAULT_URL_TTL;
use crate::application::services::{AnalyticsService, LinkService};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::CacheService;
use crate::utils::node_registry::NodeRegistry;
use crate::utils::url_validator::DefaultUrlValidator;

/// Knobs the services are built with.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub node_id: i64,
    pub url_ttl: Duration,
    pub analytics_ttl: Duration,
    pub blocked_domains: Vec<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            node_id: 1,
            url_ttl: DEFAULT_URL_TTL,
            analytics_ttl: DEFAULT_ANALYTICS_TTL,
            blocked_domains: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService<dyn LinkRepository>>,
    pub analytics_service: Arc<AnalyticsService<dyn LinkRepository>>,
    /// Durable store, used directly by health checks.
    pub links: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub base_url: String,
    pub click_tx: mpsc::Sender<ClickEvent>,
}

impl AppState {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        registry: Arc<NodeRegistry>,
        click_tx: mpsc::Sender<ClickEvent>,
        settings: ServiceSettings,
    ) -> Self {
        let validator = Arc::new(DefaultUrlValidator::new(&settings.blocked_domains));

        let link_service = LinkService::new(
            Arc::clone(&links),
            Arc::clone(&cache),
            registry,
            settings.node_id,
            click_tx.clone(),
        )
        .with_validator(validator)
        .with_url_ttl(settings.url_ttl);

        let analytics_service = AnalyticsService::new(Arc::clone(&links), Arc::clone(&cache))
            .with_ttl(settings.analytics_ttl);

        Self {
            link_service: Arc::new(link_service),
            analytics_service: Arc::new(analytics_service),
            links,
            cache,
            base_url: settings.base_url,
            click_tx,
        }
    }
}
