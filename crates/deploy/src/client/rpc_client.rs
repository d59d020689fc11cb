//! [`ChainClient`] over Ethereum JSON-RPC with a local signing key.

use std::time::Duration;

use alloy_core::primitives::{Address, TxHash, U64, U128};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;

use super::{
    ArtifactStore, BuildArtifact, ChainClient, Confirmation, LegacyTransaction,
    PendingTransaction, Receipt,
    json_rpc::{JsonRpc, RpcError},
};
use crate::{ChainError, ConfirmationError, ConstructorArgs, ContractName, Credential, DeployConfig};

/// Consecutive polls where the node knows neither receipt nor transaction before the
/// transaction is reported as dropped.
const MAX_UNKNOWN_POLLS: u32 = 5;

/// Consecutive transport failures tolerated while waiting for a receipt.
const MAX_TRANSPORT_FAILURES: u32 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    block_number: U64,
    gas_used: U64,
    /// Absent on pre-Byzantium receipts.
    status: Option<U64>,
    contract_address: Option<Address>,
}

impl RpcReceipt {
    fn into_confirmation(self) -> Result<Confirmation, ConfirmationError> {
        let tx_hash = self.transaction_hash;
        let block_number = self.block_number.to::<u64>();

        if self.status.is_some_and(|status| status.is_zero()) {
            return Err(ConfirmationError::Reverted {
                tx_hash,
                block_number,
            });
        }

        let address = self
            .contract_address
            .ok_or(ConfirmationError::MissingContractAddress { tx_hash })?;

        Ok(Confirmation {
            address,
            receipt: Receipt {
                tx_hash,
                block_number,
                gas_used: self.gas_used.to::<u64>(),
            },
        })
    }
}

/// Deploys through a JSON-RPC node, signing EIP-155 transactions with a local key.
#[derive(Debug)]
pub struct RpcChainClient {
    rpc: JsonRpc,
    chain_id: u64,
    credential: Credential,
    artifacts: ArtifactStore,
    poll_interval: Duration,
}

impl RpcChainClient {
    /// Connect to the configured network and check that it serves the expected chain.
    pub async fn connect(config: &DeployConfig, credential: Credential) -> Result<Self, ChainError> {
        let rpc = JsonRpc::new(config.network.rpc_url.clone())?;

        let chain_id: U64 = rpc
            .query("eth_chainId", vec![])
            .await
            .map_err(RpcError::into_query_error)?;
        let chain_id = chain_id.to::<u64>();

        if chain_id != config.network.chain_id {
            return Err(ChainError::Connectivity(format!(
                "{} serves chain id {chain_id}, expected {}",
                rpc.url(),
                config.network.chain_id
            )));
        }

        tracing::info!(
            network = %config.network.name,
            chain_id,
            sender = %credential.address(),
            compiler = %config.compiler.version,
            artifacts = %config.compiler.artifacts.display(),
            "Connected to network"
        );

        Ok(Self {
            rpc,
            chain_id,
            credential,
            artifacts: ArtifactStore::new(&config.compiler.artifacts),
            poll_interval: config.confirmation.poll_interval(),
        })
    }

    /// Address that signs and pays for every deployment.
    pub fn sender(&self) -> Address {
        self.credential.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn transaction_known(&self, tx_hash: TxHash) -> bool {
        match self
            .rpc
            .call::<Option<Value>>("eth_getTransactionByHash", vec![json!(tx_hash)])
            .await
        {
            Ok(tx) => tx.is_some(),
            // Only a definite "unknown" counts towards dropping the transaction.
            Err(_) => true,
        }
    }
}

impl ChainClient for RpcChainClient {
    async fn resolve_artifact(&self, contract: &ContractName) -> Result<BuildArtifact, ChainError> {
        self.artifacts.resolve(contract)
    }

    async fn submit_creation(
        &self,
        artifact: &BuildArtifact,
        args: &ConstructorArgs,
    ) -> Result<PendingTransaction, ChainError> {
        let init_code = artifact.init_code(args)?;
        let sender = self.sender();

        let nonce: U64 = self
            .rpc
            .query("eth_getTransactionCount", vec![json!(sender), json!("pending")])
            .await
            .map_err(RpcError::into_query_error)?;
        let nonce = nonce.to::<u64>();

        let gas_price: U128 = self
            .rpc
            .query("eth_gasPrice", vec![])
            .await
            .map_err(RpcError::into_query_error)?;

        let gas_limit: U64 = self
            .rpc
            .query(
                "eth_estimateGas",
                vec![json!({ "from": sender, "data": init_code })],
            )
            .await
            .map_err(|err| match err {
                RpcError::Response { message, .. } => {
                    ChainError::Submission(format!("gas estimation failed: {message}"))
                }
                other => other.into_query_error(),
            })?;

        let tx = LegacyTransaction::creation(
            self.chain_id,
            nonce,
            gas_price.saturating_to::<u128>(),
            gas_limit.to::<u64>(),
            init_code,
        );
        let signed = tx
            .sign(self.credential.signing_key())
            .map_err(|e| ChainError::Submission(format!("failed to sign transaction: {e}")))?;

        tracing::info!(
            contract = %artifact.contract,
            nonce,
            gas_limit = tx.gas_limit,
            gas_price = tx.gas_price,
            expected_address = %sender.create(nonce),
            tx_hash = %signed.hash,
            "Broadcasting creation transaction"
        );

        let tx_hash: TxHash = self
            .rpc
            .call("eth_sendRawTransaction", vec![json!(signed.raw)])
            .await
            .map_err(|err| match err {
                RpcError::Response { message, .. } => ChainError::Submission(message),
                other => ChainError::Connectivity(format!(
                    "{other}; transaction {} may have been broadcast",
                    signed.hash
                )),
            })?;

        Ok(PendingTransaction {
            tx_hash,
            contract: artifact.contract.clone(),
        })
    }

    async fn await_confirmation(
        &self,
        pending: &PendingTransaction,
        timeout: Duration,
    ) -> Result<Confirmation, ChainError> {
        let tx_hash = pending.tx_hash;
        let deadline = Instant::now() + timeout;
        let mut unknown_polls = 0;
        let mut transport_failures = 0;

        loop {
            match self
                .rpc
                .call::<Option<RpcReceipt>>("eth_getTransactionReceipt", vec![json!(tx_hash)])
                .await
            {
                Ok(Some(receipt)) => return Ok(receipt.into_confirmation()?),
                Ok(None) => {
                    transport_failures = 0;
                    if self.transaction_known(tx_hash).await {
                        unknown_polls = 0;
                    } else {
                        unknown_polls += 1;
                        if unknown_polls >= MAX_UNKNOWN_POLLS {
                            return Err(ConfirmationError::Dropped { tx_hash }.into());
                        }
                    }
                }
                Err(err @ RpcError::Transport { .. }) => {
                    transport_failures += 1;
                    tracing::warn!(
                        tx_hash = %tx_hash,
                        error = %err,
                        attempt = transport_failures,
                        "Receipt poll failed"
                    );
                    if transport_failures >= MAX_TRANSPORT_FAILURES {
                        return Err(ChainError::Connectivity(format!(
                            "{err}; transaction {tx_hash} status is unknown"
                        )));
                    }
                }
                Err(err) => return Err(err.into_query_error()),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ConfirmationError::Timeout {
                    tx_hash,
                    waited: timeout,
                }
                .into());
            }
            tracing::trace!(tx_hash = %tx_hash, "Transaction not yet included, polling...");
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
