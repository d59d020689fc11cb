use std::path::PathBuf;

use clap::Parser;
use ordkit_deploy::{CREDENTIAL_ENV, DeployConfig, NetworkPreset};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "ordkit")]
#[command(
    author,
    version,
    about = "Deploy the ORD staking contracts in dependency order"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "ORDKIT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file, or to a directory containing `Ordkit.toml`.
    ///
    /// If not provided, `./Ordkit.toml` is used when it exists.
    #[arg(short, long, visible_alias = "conf", env = "ORDKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// A well-known network. Replaces the whole `[network]` section.
    #[arg(long, env = "ORDKIT_PRESET")]
    pub preset: Option<NetworkPreset>,

    /// The URL of the JSON-RPC endpoint.
    #[arg(long, alias = "rpc", env = "ORDKIT_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// The chain ID the endpoint must report.
    #[arg(long, env = "ORDKIT_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Root of the compiler output (Hardhat `artifacts/` or Foundry `out/`).
    #[arg(long, env = "ORDKIT_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// How long to wait for each contract to be confirmed, in seconds.
    #[arg(long, env = "ORDKIT_CONFIRMATION_TIMEOUT")]
    pub confirmation_timeout: Option<u64>,

    /// Environment variable holding the hex-encoded deployer key.
    #[arg(long, env = "ORDKIT_CREDENTIAL_ENV", default_value = CREDENTIAL_ENV)]
    pub credential_env: String,

    /// Print the deployment plan and exit without contacting the network.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not write a deployment report.
    #[arg(long, env = "ORDKIT_NO_REPORT")]
    pub no_report: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut DeployConfig) {
        if let Some(preset) = self.preset {
            config.network = preset.network();
        }
        if let Some(rpc_url) = &self.rpc_url {
            config.network.rpc_url = rpc_url.clone();
        }
        if let Some(chain_id) = self.chain_id {
            config.network.chain_id = chain_id;
        }
        if let Some(artifacts) = &self.artifacts {
            config.compiler.artifacts = artifacts.clone();
        }
        if let Some(timeout) = self.confirmation_timeout {
            config.confirmation.timeout_secs = timeout;
        }
        if self.no_report {
            config.report.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ordkit"]).unwrap();
        assert_eq!(cli.credential_env, "PRIVATE_KEY");
        assert!(!cli.dry_run);

        let mut config = DeployConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "ordkit",
            "--preset",
            "pulsechain-testnet",
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--confirmation-timeout",
            "60",
            "--no-report",
        ])
        .unwrap();

        let mut config = DeployConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.network.name, "pulsechain-testnet");
        assert_eq!(config.network.chain_id, 943);
        assert_eq!(config.network.rpc_url.as_str(), "http://127.0.0.1:8545/");
        assert_eq!(config.confirmation.timeout_secs, 60);
        assert!(!config.report.enabled);
    }

    #[test]
    fn test_unknown_preset_rejected() {
        assert!(Cli::try_parse_from(["ordkit", "--preset", "goerli"]).is_err());
    }
}
