//! Persistent record of a deployment run.
//!
//! Written after every run, successful or not, so an operator can see which contracts
//! exist on-chain before deciding how to resume.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Table, presets::UTF8_FULL};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{DeployConfig, DeploymentOutcome, DeploymentPlan, StepName, StepRecord, StepState};

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// The step that aborted a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub step: StepName,
    pub cause: String,
}

/// Deployment report stored as `<report dir>/<network>-<timestamp>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub network: String,
    pub chain_id: u64,
    pub compiler_version: String,
    /// Fingerprint of the executed plan, see [`DeploymentPlan::fingerprint`].
    pub plan_fingerprint: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Confirmed addresses in deployment order.
    pub addresses: IndexMap<StepName, Address>,
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureRecord>,
    /// Version of ordkit that produced the report.
    pub ordkit_version: String,
}

impl DeploymentReport {
    pub fn new(config: &DeployConfig, plan: &DeploymentPlan, outcome: &DeploymentOutcome) -> Self {
        let run = outcome.run();

        Self {
            network: config.network.name.clone(),
            chain_id: config.network.chain_id,
            compiler_version: config.compiler.version.clone(),
            plan_fingerprint: plan.fingerprint(),
            status: if outcome.is_completed() {
                RunStatus::Completed
            } else {
                RunStatus::Aborted
            },
            started_at: run.started_at,
            finished_at: run.finished_at,
            addresses: run
                .registry
                .iter()
                .map(|(step, address)| (step.clone(), *address))
                .collect(),
            steps: run.steps.clone(),
            failure: outcome.error().map(|error| FailureRecord {
                step: error.step.clone(),
                cause: error.cause.to_string(),
            }),
            ordkit_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// File name for this report inside the report directory.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.json",
            self.network,
            self.started_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    /// Write the report as pretty JSON into `dir`, creating it if needed.
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

        let path = dir.join(self.file_name());
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write deployment report to {}", path.display()))?;

        tracing::info!(path = %path.display(), status = %self.status, "Deployment report saved");
        Ok(path)
    }

    /// Operator summary: one row per step with its final state.
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Step", "Contract", "State", "Address", "Transaction"]);

        for record in &self.steps {
            let address = match &record.state {
                StepState::Confirmed { address, .. } => address.to_string(),
                _ => String::new(),
            };
            let tx_hash = record
                .state
                .tx_hash()
                .map(|hash| hash.to_string())
                .unwrap_or_default();

            table.add_row(vec![
                record.step.to_string(),
                record.contract.to_string(),
                record.state.to_string(),
                address,
                tx_hash,
            ]);
        }

        table
    }
}
