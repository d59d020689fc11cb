//! ordkit-deploy - Dependency-ordered contract deployment.
//!
//! This crate deploys a fixed set of interdependent contracts to one network, threading
//! the addresses of earlier deployments into the constructor arguments of later ones.
//!
//! A [`DeploymentPlan`] is validated when it is built. The [`Orchestrator`] executes it
//! one step at a time through a [`ChainClient`], waiting for each creation transaction
//! to be confirmed before starting the next, and stops at the first failure.
//!
//! # Example
//!
//! ```no_run
//! use ordkit_deploy::{Credential, DeployConfig, Orchestrator, RpcChainClient, staking_suite};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DeployConfig::load(None)?;
//! let plan = staking_suite(&config.addresses)?;
//! let client = RpcChainClient::connect(&config, Credential::from_env("PRIVATE_KEY")?).await?;
//!
//! let outcome = Orchestrator::new(client)
//!     .confirmation_timeout(config.confirmation.timeout())
//!     .run(&plan)
//!     .await;
//! std::process::exit(outcome.exit_status().into());
//! # }
//! ```

mod client;
mod config;
mod error;
mod orchestrator;
mod plan;
mod registry;
mod report;

pub use client::{
    ArtifactStore, BuildArtifact, ChainClient, Confirmation, LegacyTransaction,
    PendingTransaction, Receipt, RpcChainClient, SignedTransaction,
};
pub use config::{
    CONFIG_FILENAME, CREDENTIAL_ENV, CompilerConfig, ConfirmationConfig, Credential,
    DeployConfig, ENV_PREFIX, NetworkConfig, NetworkPreset, ReportConfig,
};
pub use error::{ChainError, ConfirmationError, PlanError, RegistryError, StepError, StepFailure};
pub use orchestrator::{
    DEFAULT_CONFIRMATION_TIMEOUT, DeploymentOutcome, DeploymentRun, Orchestrator,
    ProgressRecord,
};
pub use plan::{
    ADMIN, ArgSource, ArgValue, BUY_AND_BURN, ConstructorArgs, ContractName, DISTRIBUTOR,
    DeploymentPlan, DeploymentResult, DeploymentStep, PlanBuilder, STAKING, StepName,
    StepRecord, StepState, staking_suite,
};
pub use registry::AddressRegistry;
pub use report::{DeploymentReport, FailureRecord, RunStatus};
