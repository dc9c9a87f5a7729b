use std::sync::Arc;

use sampan_index::store::KnowledgeStore;
use sampan_service::TourService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TourService>,
}
impl AppState {
	pub async fn new(config: sampan_config::Config) -> color_eyre::Result<Self> {
		let store = KnowledgeStore::new(&config.storage.qdrant)?;

		store.ensure_collection().await?;

		Ok(Self { service: Arc::new(TourService::new(config, store)) })
	}

	/// Assembles state around a prebuilt service; tests inject stub providers
	/// through this.
	pub fn with_service(service: Arc<TourService>) -> Self {
		Self { service }
	}
}
