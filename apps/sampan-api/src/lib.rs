pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use color_eyre::eyre;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sampan_service::TourService;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = sampan_cli::VERSION,
	rename_all = "kebab",
	styles = sampan_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sampan_config::load(&args.config)?;
	init_tracing(&config)?;
	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;
	if config.security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"http_bind must be a loopback address when bind_localhost_only is true."
		));
	}
	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}
	let sweep_interval = Duration::from_secs(config.cache.sweep_interval_secs);
	let state = AppState::new(config).await?;

	spawn_sweeper(state.service.clone(), sweep_interval);

	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state);

	let http_listener = TcpListener::bind(http_addr).await?;
	tracing::info!(%http_addr, "HTTP server listening.");
	let http_server = axum::serve(http_listener, app);

	let admin_listener = TcpListener::bind(admin_addr).await?;
	tracing::info!(%admin_addr, "Admin server listening.");
	let admin_server = axum::serve(admin_listener, admin_app);

	tokio::try_join!(http_server, admin_server)?;
	Ok(())
}

fn init_tracing(config: &sampan_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	Ok(())
}

/// Periodic TTL sweep. The cache and session stores live in this process,
/// so the maintenance loop does too.
fn spawn_sweeper(service: Arc<TourService>, interval: Duration) {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);

		// The first tick completes immediately; skip it.
		ticker.tick().await;

		loop {
			ticker.tick().await;
			service.sweep(OffsetDateTime::now_utc());
		}
	});
}
