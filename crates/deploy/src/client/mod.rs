//! Chain client boundary.
//!
//! The orchestrator only talks to the network through [`ChainClient`]. The
//! [`RpcChainClient`] implementation speaks JSON-RPC to a node and signs creation
//! transactions locally.

mod artifact;
mod json_rpc;
mod rpc_client;
mod transaction;

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

pub use artifact::{ArtifactStore, BuildArtifact};
pub use rpc_client::RpcChainClient;
pub use transaction::{LegacyTransaction, SignedTransaction};

use crate::{ChainError, ConstructorArgs, ContractName};

/// A creation transaction accepted by the network but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    pub contract: ContractName,
}

/// Inclusion receipt of a creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

/// A confirmed contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub address: Address,
    pub receipt: Receipt,
}

/// Connected handle to one network.
///
/// Implementations must not retry a creation once it has been broadcast: a retry
/// could create the contract twice.
pub trait ChainClient: Send + Sync {
    /// Look up the build artifact for `contract`. Exactly one artifact must match.
    fn resolve_artifact(
        &self,
        contract: &ContractName,
    ) -> impl Future<Output = Result<BuildArtifact, ChainError>> + Send;

    /// Broadcast a creation transaction for `artifact` with `args`.
    fn submit_creation(
        &self,
        artifact: &BuildArtifact,
        args: &ConstructorArgs,
    ) -> impl Future<Output = Result<PendingTransaction, ChainError>> + Send;

    /// Wait until `pending` is included, or fail once `timeout` has elapsed.
    fn await_confirmation(
        &self,
        pending: &PendingTransaction,
        timeout: Duration,
    ) -> impl Future<Output = Result<Confirmation, ChainError>> + Send;
}
