use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = sampan_api::Args::parse();
	sampan_api::run(args).await
}
