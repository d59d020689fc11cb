//! Error taxonomy for plan validation and step execution.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::TxHash;

use crate::{ContractName, StepName};

/// A plan that cannot be executed.
///
/// Always raised while the plan is being built, before any chain client is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("step `{0}` is declared more than once")]
    DuplicateStep(StepName),

    #[error("step `{0}` depends on itself")]
    SelfDependency(StepName),

    #[error("step `{step}` depends on `{dependency}`, which is declared later in the plan")]
    ForwardDependency { step: StepName, dependency: StepName },

    #[error("step `{step}` depends on undeclared step `{dependency}`")]
    UnknownDependency { step: StepName, dependency: StepName },

    #[error(
        "step `{step}` reads the address of `{output}` without declaring it as a dependency"
    )]
    UndeclaredOutput { step: StepName, output: StepName },

    #[error("step `{step}` needs the `{key}` address, which is missing from [addresses]")]
    MissingAddress { step: StepName, key: String },
}

/// Failure reported by a [`ChainClient`](crate::ChainClient).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("no build artifact named `{0}`")]
    ArtifactNotFound(ContractName),

    #[error("contract name `{contract}` matches {} build artifacts: {candidates:?}", candidates.len())]
    AmbiguousArtifact {
        contract: ContractName,
        candidates: Vec<PathBuf>,
    },

    #[error("build artifact for `{contract}` is unusable: {reason}")]
    InvalidArtifact {
        contract: ContractName,
        reason: String,
    },

    #[error("constructor of `{contract}` does not accept the arguments: {reason}")]
    ArgumentMismatch {
        contract: ContractName,
        reason: String,
    },

    #[error("deployment transaction rejected: {0}")]
    Submission(String),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error("chain client connectivity error: {0}")]
    Connectivity(String),
}

/// The network did not confirm a submitted creation transaction.
///
/// Except for [`ConfirmationError::Reverted`], the transaction may still land later,
/// so its on-chain status must be checked before any manual retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmationError {
    #[error(
        "transaction {tx_hash} was not confirmed within {}s, its on-chain status is unknown",
        waited.as_secs()
    )]
    Timeout { tx_hash: TxHash, waited: Duration },

    #[error("transaction {tx_hash} reverted in block {block_number}")]
    Reverted { tx_hash: TxHash, block_number: u64 },

    #[error("transaction {tx_hash} is no longer known to the node")]
    Dropped { tx_hash: TxHash },

    #[error("receipt for transaction {tx_hash} carries no contract address")]
    MissingContractAddress { tx_hash: TxHash },
}

/// Attempt to write an already-set key into the [`AddressRegistry`](crate::AddressRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("address registry already holds an entry for `{0}`")]
pub struct RegistryError(pub StepName);

/// Underlying cause of a failed step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepFailure {
    #[error("dependency `{dependency}` has no address in the registry")]
    ArgumentResolution { dependency: StepName },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A deployment step failed. Aborts the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step `{step}` failed: {cause}")]
pub struct StepError {
    pub step: StepName,
    pub cause: StepFailure,
}

impl StepError {
    pub fn new(step: StepName, cause: impl Into<StepFailure>) -> Self {
        Self {
            step,
            cause: cause.into(),
        }
    }
}
