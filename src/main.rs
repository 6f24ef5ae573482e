use rust_static_server::{Config, ConfigError};
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config = match Config::from_args() {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    info!("root={}", config.root_dir.display());
    rust_static_server::run(&config)?;
    info!("shut down cleanly");
    Ok(())
}
