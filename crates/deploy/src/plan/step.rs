//! A single contract deployment and its per-run state.

use std::{collections::BTreeSet, fmt, time::Duration};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, TxHash, U256},
};
use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};

use crate::{
    AddressRegistry, ChainClient, ConfirmationError, Receipt, StepError, StepFailure,
};

/// Name of a step, also the key its address is registered under.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StepName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StepName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Name of a compiled build artifact.
///
/// Either a bare contract name (`Admin`) or a fully qualified one
/// (`contracts/Admin.sol:Admin`) when the bare name is ambiguous.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContractName(String);

impl ContractName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a fully qualified name into `(source path, contract name)`.
    pub fn qualified_parts(&self) -> Option<(&str, &str)> {
        self.0.rsplit_once(':')
    }

    /// File name of the source unit of a fully qualified name (`Staking.sol`).
    pub fn source_file(&self) -> Option<&str> {
        self.qualified_parts()
            .map(|(source, _)| source.rsplit('/').next().unwrap_or(source))
    }

    /// The contract name without any source qualifier.
    pub fn bare(&self) -> &str {
        self.qualified_parts()
            .map(|(_, name)| name)
            .unwrap_or(&self.0)
    }
}

impl From<&str> for ContractName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ContractName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A fully resolved constructor argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
}

impl ArgValue {
    /// Convert to an ABI value of type `ty`, or `None` if the value does not fit it.
    pub fn to_sol(&self, ty: &DynSolType) -> Option<DynSolValue> {
        match (self, ty) {
            (Self::Address(address), DynSolType::Address) => Some(DynSolValue::Address(*address)),
            (Self::Uint(value), DynSolType::Uint(bits)) if value.bit_len() <= *bits => {
                Some(DynSolValue::Uint(*value, *bits))
            }
            (Self::Bool(value), DynSolType::Bool) => Some(DynSolValue::Bool(*value)),
            (Self::String(value), DynSolType::String) => Some(DynSolValue::String(value.clone())),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Uint(_) => "uint",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(f, "{address}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// Where a constructor argument comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgSource {
    /// A value fixed when the plan is built.
    Static(ArgValue),
    /// The address deployed by an earlier step.
    Output(StepName),
}

impl fmt::Display for ArgSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => write!(f, "{value}"),
            Self::Output(step) => write!(f, "<address of {step}>"),
        }
    }
}

/// Constructor arguments with every registry reference replaced by an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref)]
#[serde(transparent)]
pub struct ConstructorArgs(Vec<ArgValue>);

impl FromIterator<ArgValue> for ConstructorArgs {
    fn from_iter<I: IntoIterator<Item = ArgValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One contract creation in a [`DeploymentPlan`](crate::DeploymentPlan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStep {
    /// Step name, used as the registry key for the deployed address.
    pub name: StepName,
    /// Build artifact to deploy.
    pub contract: ContractName,
    /// Constructor argument sources, in ABI order.
    #[serde(default)]
    pub args: Vec<ArgSource>,
    /// Steps that must be deployed before this one.
    #[serde(default)]
    pub depends_on: BTreeSet<StepName>,
}

impl DeploymentStep {
    pub fn new(name: impl Into<StepName>, contract: impl Into<ContractName>) -> Self {
        Self {
            name: name.into(),
            contract: contract.into(),
            args: Vec::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Append a static constructor argument.
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.args.push(ArgSource::Static(value.into()));
        self
    }

    /// Append the address deployed by `step` as the next constructor argument.
    ///
    /// Also declares `step` as a dependency.
    pub fn output_of(mut self, step: impl Into<StepName>) -> Self {
        let step = step.into();
        self.depends_on.insert(step.clone());
        self.args.push(ArgSource::Output(step));
        self
    }

    /// Declare an ordering dependency without reading its address.
    pub fn after(mut self, step: impl Into<StepName>) -> Self {
        self.depends_on.insert(step.into());
        self
    }

    /// Steps whose addresses this step reads.
    pub fn outputs_read(&self) -> impl Iterator<Item = &StepName> {
        self.args.iter().filter_map(|arg| match arg {
            ArgSource::Output(step) => Some(step),
            ArgSource::Static(_) => None,
        })
    }

    /// Build the constructor arguments from the registry.
    pub fn resolve_args(&self, registry: &AddressRegistry) -> Result<ConstructorArgs, StepFailure> {
        self.args
            .iter()
            .map(|arg| match arg {
                ArgSource::Static(value) => Ok(value.clone()),
                ArgSource::Output(step) => registry.get(step).map(ArgValue::Address).ok_or_else(
                    || StepFailure::ArgumentResolution {
                        dependency: step.clone(),
                    },
                ),
            })
            .collect()
    }

    /// Deploy this step and wait for its confirmation.
    ///
    /// The registry must hold every dependency. The registry is not modified; the caller
    /// records the returned address. The creation transaction is submitted at most once.
    pub async fn execute<C: ChainClient>(
        &self,
        client: &C,
        registry: &AddressRegistry,
        confirmation_timeout: Duration,
        record: &mut StepRecord,
    ) -> Result<DeploymentResult, StepError> {
        let args = self
            .resolve_args(registry)
            .map_err(|cause| self.error(cause))?;

        let artifact = client
            .resolve_artifact(&self.contract)
            .await
            .map_err(|cause| self.error(cause))?;

        tracing::debug!(
            step = %self.name,
            contract = %self.contract,
            args = args.len(),
            "Submitting creation transaction"
        );

        let pending = client
            .submit_creation(&artifact, &args)
            .await
            .map_err(|cause| self.error(cause))?;
        record.submitted(pending.tx_hash);

        tracing::info!(
            step = %self.name,
            tx_hash = %pending.tx_hash,
            timeout_secs = confirmation_timeout.as_secs(),
            "Waiting for confirmation"
        );

        let confirmation = match tokio::time::timeout(
            confirmation_timeout,
            client.await_confirmation(&pending, confirmation_timeout),
        )
        .await
        {
            Ok(confirmation) => confirmation.map_err(|cause| self.error(cause))?,
            Err(_) => {
                return Err(self.error(crate::ChainError::from(ConfirmationError::Timeout {
                    tx_hash: pending.tx_hash,
                    waited: confirmation_timeout,
                })));
            }
        };
        record.confirmed(pending.tx_hash, confirmation.address);

        Ok(DeploymentResult {
            step: self.name.clone(),
            contract: self.contract.clone(),
            address: confirmation.address,
            receipt: confirmation.receipt,
        })
    }

    fn error(&self, cause: impl Into<StepFailure>) -> StepError {
        StepError::new(self.name.clone(), cause)
    }
}

/// A confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub step: StepName,
    pub contract: ContractName,
    pub address: Address,
    pub receipt: Receipt,
}

/// Lifecycle of a step within one run.
///
/// `Pending -> Submitted -> Confirmed`, or `Pending | Submitted -> Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Submitted { tx_hash: TxHash },
    Confirmed { tx_hash: TxHash, address: Address },
    Failed { tx_hash: Option<TxHash> },
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Failed { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Pending => None,
            Self::Submitted { tx_hash } | Self::Confirmed { tx_hash, .. } => Some(*tx_hash),
            Self::Failed { tx_hash } => *tx_hash,
        }
    }

    fn permits(&self, next: &StepState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Submitted { .. })
                | (Self::Submitted { .. }, Self::Confirmed { .. })
                | (Self::Pending | Self::Submitted { .. }, Self::Failed { .. })
        )
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Submitted { .. } => f.write_str("submitted"),
            Self::Confirmed { .. } => f.write_str("confirmed"),
            Self::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// Tracks the state of one step during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepName,
    pub contract: ContractName,
    #[serde(flatten)]
    pub state: StepState,
}

impl StepRecord {
    pub fn pending(step: &DeploymentStep) -> Self {
        Self {
            step: step.name.clone(),
            contract: step.contract.clone(),
            state: StepState::Pending,
        }
    }

    pub fn submitted(&mut self, tx_hash: TxHash) {
        self.advance(StepState::Submitted { tx_hash });
    }

    pub fn confirmed(&mut self, tx_hash: TxHash, address: Address) {
        self.advance(StepState::Confirmed { tx_hash, address });
    }

    pub fn failed(&mut self) {
        let tx_hash = self.state.tx_hash();
        self.advance(StepState::Failed { tx_hash });
    }

    fn advance(&mut self, next: StepState) {
        if self.state.permits(&next) {
            self.state = next;
        } else {
            tracing::warn!(
                step = %self.step,
                from = %self.state,
                to = %next,
                "Ignoring invalid step state transition"
            );
        }
    }
}
