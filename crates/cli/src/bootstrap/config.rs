use music_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;

    info!(
        config_file = config_path.unwrap_or("default"),
        api_port = config.apiserver.port,
        identity = %config.sidecar.identity,
        resolver = %config.resolver.address,
        signers = config.signers.len(),
        "Configuration loaded"
    );

    Ok(config)
}
