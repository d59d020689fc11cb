//! Dependency-ordered deployment plans.
//!
//! A plan is an ordered list of [`DeploymentStep`]s. Every dependency of a step must be
//! declared strictly earlier in the list, so the declaration order is always a valid
//! execution order. This is checked once, when the plan is built.
//!
//! # Example
//!
//! ```
//! use ordkit_deploy::{DeploymentPlan, DeploymentStep};
//!
//! let plan = DeploymentPlan::builder()
//!     .then(DeploymentStep::new("Distributor", "DividendDistributor"))
//!     .then(DeploymentStep::new("Staking", "Staking").output_of("Distributor"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(plan.len(), 2);
//! ```

mod staking;
mod step;

use std::collections::HashMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

pub use staking::{ADMIN, BUY_AND_BURN, DISTRIBUTOR, STAKING, staking_suite};
pub use step::{
    ArgSource, ArgValue, ConstructorArgs, ContractName, DeploymentResult, DeploymentStep,
    StepName, StepRecord, StepState,
};

use crate::PlanError;

/// A validated, fully ordered sequence of deployment steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeploymentPlan {
    steps: Vec<DeploymentStep>,
}

impl DeploymentPlan {
    /// Build a plan from steps in execution order.
    pub fn new(steps: Vec<DeploymentStep>) -> Result<Self, PlanError> {
        validate_steps(&steps)?;
        Ok(Self { steps })
    }

    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    /// Re-run validation. Pure: the same plan always yields the same answer.
    pub fn validate(&self) -> Result<(), PlanError> {
        validate_steps(&self.steps)
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// SHA-256 of the serialized plan, hex-encoded.
    ///
    /// Identifies which plan produced a deployment report.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(&self.steps)
            .expect("DeploymentPlan serialization should never fail");

        let mut hasher = Sha256::new();
        hasher.update(&json);
        hex::encode(hasher.finalize())
    }
}

/// Incremental builder for a [`DeploymentPlan`].
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    steps: Vec<DeploymentStep>,
}

impl PlanBuilder {
    /// Append a step after every step added so far.
    pub fn then(mut self, step: DeploymentStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> Result<DeploymentPlan, PlanError> {
        DeploymentPlan::new(self.steps)
    }
}

fn validate_steps(steps: &[DeploymentStep]) -> Result<(), PlanError> {
    let mut positions = HashMap::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        if positions.insert(&step.name, index).is_some() {
            return Err(PlanError::DuplicateStep(step.name.clone()));
        }
    }

    for (index, step) in steps.iter().enumerate() {
        for dependency in &step.depends_on {
            if dependency == &step.name {
                return Err(PlanError::SelfDependency(step.name.clone()));
            }

            match positions.get(dependency) {
                None => {
                    return Err(PlanError::UnknownDependency {
                        step: step.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
                Some(&position) if position > index => {
                    return Err(PlanError::ForwardDependency {
                        step: step.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        if let Some(output) = step
            .outputs_read()
            .find(|output| !step.depends_on.contains(*output))
        {
            return Err(PlanError::UndeclaredOutput {
                step: step.name.clone(),
                output: output.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Vec<DeploymentStep> {
        vec![
            DeploymentStep::new("A", "A"),
            DeploymentStep::new("B", "B").output_of("A"),
            DeploymentStep::new("C", "C"),
            DeploymentStep::new("D", "D").output_of("B").output_of("C"),
        ]
    }

    #[test]
    fn test_valid_plan_keeps_order() {
        let plan = DeploymentPlan::new(diamond()).unwrap();
        let names: Vec<_> = plan.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_forward_reference_rejected() {
        let err = DeploymentPlan::builder()
            .then(DeploymentStep::new("B", "B").output_of("A"))
            .then(DeploymentStep::new("A", "A"))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            PlanError::ForwardDependency {
                step: "B".into(),
                dependency: "A".into()
            }
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let err = DeploymentPlan::new(vec![
            DeploymentStep::new("A", "A").after("B"),
            DeploymentStep::new("B", "B").after("A"),
        ])
        .unwrap_err();

        assert!(matches!(err, PlanError::ForwardDependency { .. }));
    }

    #[test]
    fn test_self_reference_rejected() {
        let err = DeploymentPlan::new(vec![DeploymentStep::new("A", "A").output_of("A")])
            .unwrap_err();
        assert_eq!(err, PlanError::SelfDependency("A".into()));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = DeploymentPlan::new(vec![
            DeploymentStep::new("A", "A"),
            DeploymentStep::new("B", "B").after("Ghost"),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            PlanError::UnknownDependency {
                step: "B".into(),
                dependency: "Ghost".into()
            }
        );
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let err = DeploymentPlan::new(vec![
            DeploymentStep::new("A", "A"),
            DeploymentStep::new("A", "Other"),
        ])
        .unwrap_err();
        assert_eq!(err, PlanError::DuplicateStep("A".into()));
    }

    #[test]
    fn test_output_read_without_dependency_rejected() {
        let mut reader = DeploymentStep::new("B", "B");
        reader.args.push(ArgSource::Output("A".into()));

        let err = DeploymentPlan::new(vec![DeploymentStep::new("A", "A"), reader]).unwrap_err();
        assert_eq!(
            err,
            PlanError::UndeclaredOutput {
                step: "B".into(),
                output: "A".into()
            }
        );
    }

    #[test]
    fn test_validation_is_idempotent() {
        let plan = DeploymentPlan::new(diamond()).unwrap();
        assert_eq!(plan.validate(), Ok(()));
        assert_eq!(plan.validate(), plan.validate());

        let broken = vec![DeploymentStep::new("X", "X").after("Y")];
        assert_eq!(
            DeploymentPlan::new(broken.clone()).unwrap_err(),
            DeploymentPlan::new(broken).unwrap_err()
        );
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = DeploymentPlan::new(diamond()).unwrap();
        let b = DeploymentPlan::new(diamond()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let shorter = DeploymentPlan::new(diamond()[..2].to_vec()).unwrap();
        assert_ne!(a.fingerprint(), shorter.fingerprint());
    }
}
