//! In-memory chain client shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy_core::{
    json_abi::JsonAbi,
    primitives::{Address, Bytes, TxHash, keccak256},
};
use ordkit_deploy::{
    BuildArtifact, ChainClient, ChainError, Confirmation, ConfirmationError, ConstructorArgs,
    ContractName, PendingTransaction, Receipt,
};

/// Route library logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A call made to the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(ContractName),
    Submit(ContractName, ConstructorArgs),
    Await(TxHash),
}

/// Failure injected for one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// No artifact by that name.
    MissingArtifact,
    /// Submission rejected, as with insufficient funds.
    Submission,
    /// Transaction included but reverted.
    Revert,
    /// Confirmation never arrives.
    Hang,
}

/// Deterministic [`ChainClient`] that records every call.
#[derive(Debug, Clone, Default)]
pub struct MockChainClient {
    addresses: HashMap<ContractName, Address>,
    faults: HashMap<ContractName, Fault>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirm deployments of `contract` at `address`.
    pub fn deploys(mut self, contract: &str, address: Address) -> Self {
        self.addresses.insert(contract.into(), address);
        self
    }

    pub fn fails(mut self, contract: &str, fault: Fault) -> Self {
        self.faults.insert(contract.into(), fault);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Contracts for which a creation transaction was submitted, in order.
    pub fn submitted(&self) -> Vec<ContractName> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit(contract, _) => Some(contract),
                _ => None,
            })
            .collect()
    }

    /// Arguments submitted for `contract`.
    pub fn args_for(&self, contract: &str) -> Option<ConstructorArgs> {
        self.calls().into_iter().find_map(|call| match call {
            Call::Submit(name, args) if name.as_str() == contract => Some(args),
            _ => None,
        })
    }

    /// Address the mock assigns to `contract`.
    pub fn address_of(&self, contract: &ContractName) -> Address {
        self.addresses
            .get(contract)
            .copied()
            .unwrap_or_else(|| Address::from_word(keccak256(contract.as_str())))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fault(&self, contract: &ContractName) -> Option<Fault> {
        self.faults.get(contract).copied()
    }
}

pub fn tx_hash_for(contract: &ContractName) -> TxHash {
    keccak256(format!("tx:{contract}"))
}

impl ChainClient for MockChainClient {
    async fn resolve_artifact(&self, contract: &ContractName) -> Result<BuildArtifact, ChainError> {
        self.record(Call::Resolve(contract.clone()));

        if self.fault(contract) == Some(Fault::MissingArtifact) {
            return Err(ChainError::ArtifactNotFound(contract.clone()));
        }

        Ok(BuildArtifact {
            contract: contract.clone(),
            path: PathBuf::from(format!("{contract}.json")),
            abi: JsonAbi::default(),
            bytecode: Bytes::from_static(&[0x60, 0x80]),
        })
    }

    async fn submit_creation(
        &self,
        artifact: &BuildArtifact,
        args: &ConstructorArgs,
    ) -> Result<PendingTransaction, ChainError> {
        self.record(Call::Submit(artifact.contract.clone(), args.clone()));

        if self.fault(&artifact.contract) == Some(Fault::Submission) {
            return Err(ChainError::Submission(
                "insufficient funds for gas * price + value".to_string(),
            ));
        }

        Ok(PendingTransaction {
            tx_hash: tx_hash_for(&artifact.contract),
            contract: artifact.contract.clone(),
        })
    }

    async fn await_confirmation(
        &self,
        pending: &PendingTransaction,
        _timeout: Duration,
    ) -> Result<Confirmation, ChainError> {
        self.record(Call::Await(pending.tx_hash));

        match self.fault(&pending.contract) {
            Some(Fault::Revert) => Err(ConfirmationError::Reverted {
                tx_hash: pending.tx_hash,
                block_number: 1,
            }
            .into()),
            Some(Fault::Hang) => std::future::pending().await,
            _ => Ok(Confirmation {
                address: self.address_of(&pending.contract),
                receipt: Receipt {
                    tx_hash: pending.tx_hash,
                    block_number: 1,
                    gas_used: 21_000,
                },
            }),
        }
    }
}
