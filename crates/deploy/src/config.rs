//! Deployment configuration: network, compiler output, confirmation policy and named
//! external addresses.
//!
//! Values are layered with figment: built-in defaults, then the TOML file, then
//! `ORDKIT_*` environment variables (`__` separates nesting, e.g.
//! `ORDKIT_NETWORK__RPC_URL`). The signing credential is never part of this file.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use alloy_core::primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use url::Url;

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Ordkit.toml";

/// Prefix of environment variables merged into the configuration.
pub const ENV_PREFIX: &str = "ORDKIT_";

/// Environment variable holding the hex-encoded signing key.
pub const CREDENTIAL_ENV: &str = "PRIVATE_KEY";

/// Top-level sections that may be set from the environment.
const CONFIG_SECTIONS: &[&str] = &["network", "compiler", "confirmation", "addresses", "report"];

/// Well-known networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum NetworkPreset {
    Pulsechain,
    PulsechainTestnet,
}

impl NetworkPreset {
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkPreset::Pulsechain => 369,
            NetworkPreset::PulsechainTestnet => 943,
        }
    }

    pub fn rpc_url(&self) -> Url {
        let url = match self {
            NetworkPreset::Pulsechain => "https://rpc.pulsechain.com",
            NetworkPreset::PulsechainTestnet => "https://rpc.v4.testnet.pulsechain.com",
        };
        Url::parse(url).expect("preset RPC URLs are valid")
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            name: self.to_string(),
            rpc_url: self.rpc_url(),
            chain_id: self.chain_id(),
        }
    }
}

/// Target network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Name used in logs and report file names.
    pub name: String,
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Chain ID the endpoint must report.
    pub chain_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkPreset::Pulsechain.network()
    }
}

/// Compiler output consumed by the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Solidity compiler version the artifacts were built with.
    pub version: String,
    /// Root of the compiler output (Hardhat `artifacts/` or Foundry `out/`).
    pub artifacts: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            version: "0.8.20".to_string(),
            artifacts: PathBuf::from("artifacts"),
        }
    }
}

/// How long to wait for each creation transaction to be included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            poll_interval_ms: 2_000,
        }
    }
}

/// Where deployment reports are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("deployments"),
        }
    }
}

/// Complete deployment configuration, read once before orchestration starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    /// Named external addresses referenced by the plan (`router`, `ord`, ...).
    #[serde(default)]
    pub addresses: BTreeMap<String, Address>,
    #[serde(default)]
    pub report: ReportConfig,
}

impl DeployConfig {
    /// Layer defaults, the TOML file at `path` (if any) and `ORDKIT_*` variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));

        if let Some(path) = path {
            let file = if path.is_dir() {
                path.join(CONFIG_FILENAME)
            } else {
                path.to_path_buf()
            };
            figment = figment.merge(Toml::file(file));
        }

        // Other ORDKIT_* variables belong to the CLI.
        figment.merge(
            Env::prefixed(ENV_PREFIX)
                .filter(|key| {
                    let key = key.as_str().to_ascii_lowercase();
                    CONFIG_SECTIONS
                        .iter()
                        .any(|section| key.starts_with(&format!("{section}__")))
                })
                .split("__"),
        )
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file or directory not found: {}", path.display());
            }
        }

        let config: Self = Self::figment(path)
            .extract()
            .context("Failed to load deployment configuration")?;
        config.validate()?;

        tracing::debug!(
            network = %config.network.name,
            chain_id = config.network.chain_id,
            addresses = config.addresses.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.chain_id == 0 {
            anyhow::bail!("network.chain_id must be non-zero");
        }
        if self.confirmation.timeout_secs == 0 {
            anyhow::bail!("confirmation.timeout_secs must be non-zero");
        }
        if self.confirmation.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be non-zero");
        }
        Ok(())
    }

    /// Write the effective configuration as `<dir>/<network>.toml`, creating `dir`.
    ///
    /// Includes CLI and environment overrides.
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        let path = dir.join(format!("{}.toml", self.network.name));
        self.save_to_file(&path)?;
        Ok(path)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

/// Signing key for deployment transactions.
///
/// Never serialized and never printed.
#[derive(Clone)]
pub struct Credential {
    signer: PrivateKeySigner,
}

impl Credential {
    /// Read a hex-encoded private key from environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        let value = std::env::var(var)
            .with_context(|| format!("Signing credential not set: export {var} or add it to .env"))?;
        Self::from_hex(&value).with_context(|| format!("Invalid signing credential in {var}"))
    }

    pub fn from_hex(key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(key.trim())
            .map_err(|e| anyhow::anyhow!("failed to parse private key: {e}"))?;
        Ok(Self { signer })
    }

    /// Address derived from the key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signing_key(&self) -> &SigningKey {
        self.signer.credential()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    /// First Hardhat/Anvil development account.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_defaults_target_pulsechain() {
        let config = DeployConfig::default();
        assert_eq!(config.network.chain_id, 369);
        assert_eq!(config.network.name, "pulsechain");
        assert_eq!(config.compiler.version, "0.8.20");
        assert_eq!(config.confirmation.timeout(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(
            "pulsechain-testnet".parse::<NetworkPreset>().unwrap(),
            NetworkPreset::PulsechainTestnet
        );
        assert_eq!(NetworkPreset::PulsechainTestnet.chain_id(), 943);
        assert!("mainnet".parse::<NetworkPreset>().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let tmp = TempDir::new("ordkit-config").unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[network]
name = "local"
rpc_url = "http://127.0.0.1:8545"
chain_id = 31337

[confirmation]
timeout_secs = 30
poll_interval_ms = 250

[addresses]
router = "0x165C3410fC91EF562C50559f7d2289fEbed552d9"
"#,
        )
        .unwrap();

        // A directory resolves to the default file name inside it.
        let config = DeployConfig::load(Some(tmp.path())).unwrap();
        assert_eq!(config.network.chain_id, 31337);
        assert_eq!(config.confirmation.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.compiler, CompilerConfig::default());
        assert_eq!(
            config.addresses["router"],
            "0x165C3410fC91EF562C50559f7d2289fEbed552d9"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new("ordkit-config").unwrap();
        let path = tmp.path().join("saved.toml");
        let mut config = DeployConfig::default();
        config
            .addresses
            .insert("ord".to_string(), Address::with_last_byte(7));

        config.save_to_file(&path).unwrap();
        assert_eq!(DeployConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_save_effective_config_to_dir() {
        let tmp = TempDir::new("ordkit-config").unwrap();
        let dir = tmp.path().join("deployments");
        let mut config = DeployConfig::default();
        config.network = NetworkPreset::PulsechainTestnet.network();
        config.confirmation.timeout_secs = 42;

        let path = config.save_to_dir(&dir).unwrap();
        assert_eq!(path, dir.join("pulsechain-testnet.toml"));
        assert_eq!(DeployConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_missing_config_file() {
        assert!(DeployConfig::load(Some(Path::new("/nonexistent/Ordkit.toml"))).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = DeployConfig::default();
        config.confirmation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credential_address() {
        let credential = Credential::from_hex(DEV_KEY).unwrap();
        assert_eq!(credential.address(), DEV_ADDRESS.parse::<Address>().unwrap());

        let debug = format!("{credential:?}");
        assert!(!debug.contains("ac0974bec39a17e3"));
    }

    #[test]
    fn test_invalid_credential() {
        assert!(Credential::from_hex("0x1234").is_err());
    }
}
