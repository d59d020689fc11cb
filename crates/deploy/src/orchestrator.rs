//! Plan execution engine.

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    AddressRegistry, ChainClient, DeploymentPlan, DeploymentResult, StepError, StepRecord,
};

/// Default bound on each confirmation wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Progress emitted after each step reaches a terminal state.
#[derive(Debug, Clone, Copy)]
pub enum ProgressRecord<'a> {
    Deployed(&'a DeploymentResult),
    Failed(&'a StepError),
}

impl fmt::Display for ProgressRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressRecord::Deployed(result) => {
                write!(f, "{} - Deployed at: {}", result.step, result.address)
            }
            ProgressRecord::Failed(error) => write!(f, "{} - Failed: {}", error.step, error.cause),
        }
    }
}

/// Everything a run produced, whether or not it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRun {
    /// Addresses of confirmed steps, in deployment order.
    pub registry: AddressRegistry,
    /// One result per confirmed step.
    pub results: Vec<DeploymentResult>,
    /// Final state of every step in the plan, including steps never attempted.
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of executing a [`DeploymentPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    /// Every step was confirmed.
    Completed(DeploymentRun),
    /// A step failed; no later step was attempted.
    Aborted { run: DeploymentRun, error: StepError },
}

impl DeploymentOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DeploymentOutcome::Completed(_))
    }

    pub fn run(&self) -> &DeploymentRun {
        match self {
            DeploymentOutcome::Completed(run) | DeploymentOutcome::Aborted { run, .. } => run,
        }
    }

    pub fn registry(&self) -> &AddressRegistry {
        &self.run().registry
    }

    pub fn results(&self) -> &[DeploymentResult] {
        &self.run().results
    }

    pub fn error(&self) -> Option<&StepError> {
        match self {
            DeploymentOutcome::Completed(_) => None,
            DeploymentOutcome::Aborted { error, .. } => Some(error),
        }
    }

    /// Process exit status for this outcome: `0` on completion, `1` otherwise.
    pub fn exit_status(&self) -> u8 {
        if self.is_completed() { 0 } else { 1 }
    }
}

/// Executes deployment plans against a [`ChainClient`], one step at a time.
///
/// Nothing is retried: a failed step aborts the run and the operator decides how to
/// resume from the reported addresses.
#[derive(Debug)]
pub struct Orchestrator<C> {
    client: C,
    confirmation_timeout: Duration,
}

impl<C: ChainClient> Orchestrator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    /// Bound on each step's confirmation wait.
    pub fn confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Execute `plan`, logging progress.
    pub async fn run(&self, plan: &DeploymentPlan) -> DeploymentOutcome {
        self.run_with(plan, |_| {}).await
    }

    /// Execute `plan`, passing each terminal step state to `on_progress`.
    pub async fn run_with(
        &self,
        plan: &DeploymentPlan,
        mut on_progress: impl FnMut(&ProgressRecord<'_>),
    ) -> DeploymentOutcome {
        let started_at = Utc::now();
        let mut registry = AddressRegistry::new();
        let mut results = Vec::with_capacity(plan.len());
        let mut steps: Vec<StepRecord> = plan.steps().iter().map(StepRecord::pending).collect();

        tracing::info!(steps = plan.len(), "Starting deployment plan...");

        for (index, step) in plan.steps().iter().enumerate() {
            let record = &mut steps[index];

            tracing::info!(
                step = %step.name,
                contract = %step.contract,
                position = index + 1,
                total = plan.len(),
                "Deploying step"
            );

            let outcome = step
                .execute(&self.client, &registry, self.confirmation_timeout, record)
                .await
                .and_then(|result| {
                    registry
                        .insert(result.step.clone(), result.address)
                        .map_err(|e| StepError::new(step.name.clone(), e))?;
                    Ok(result)
                });

            match outcome {
                Ok(result) => {
                    tracing::info!(
                        step = %result.step,
                        address = %result.address,
                        tx_hash = %result.receipt.tx_hash,
                        block = result.receipt.block_number,
                        gas_used = result.receipt.gas_used,
                        "Step confirmed"
                    );
                    on_progress(&ProgressRecord::Deployed(&result));
                    results.push(result);
                }
                Err(error) => {
                    record.failed();
                    tracing::error!(
                        step = %error.step,
                        error = %error.cause,
                        deployed = registry.len(),
                        skipped = plan.len() - index - 1,
                        "Step failed, aborting deployment plan"
                    );
                    on_progress(&ProgressRecord::Failed(&error));

                    let run = DeploymentRun {
                        registry,
                        results,
                        steps,
                        started_at,
                        finished_at: Utc::now(),
                    };
                    return DeploymentOutcome::Aborted { run, error };
                }
            }
        }

        tracing::info!(deployed = registry.len(), "Deployment plan completed");

        DeploymentOutcome::Completed(DeploymentRun {
            registry,
            results,
            steps,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
