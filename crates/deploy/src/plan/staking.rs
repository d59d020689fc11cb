//! The staking suite: distributor, staking, buy-and-burn and admin contracts.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;

use super::{ArgValue, DeploymentPlan, DeploymentStep, StepName};
use crate::PlanError;

pub const DISTRIBUTOR: &str = "Distributor";
pub const STAKING: &str = "Staking";
pub const BUY_AND_BURN: &str = "BuyAndBurn";
pub const ADMIN: &str = "Admin";

/// Build the staking-suite plan.
///
/// External addresses are looked up by key in `addresses` (the `[addresses]` config
/// section): `ord` is the staked token, `router` the DEX router and `treasury` the
/// treasury wallet.
///
/// 1. `Distributor`: `DividendDistributor()`
/// 2. `Staking`: `Staking(ord, Distributor)`
/// 3. `BuyAndBurn`: `BuyAndBurn(ord, router)`
/// 4. `Admin`: `Admin(treasury, BuyAndBurn, Distributor, router)`
pub fn staking_suite(addresses: &BTreeMap<String, Address>) -> Result<DeploymentPlan, PlanError> {
    let named = |step: &str, key: &str| -> Result<ArgValue, PlanError> {
        addresses
            .get(key)
            .copied()
            .map(ArgValue::Address)
            .ok_or_else(|| PlanError::MissingAddress {
                step: StepName::from(step),
                key: key.to_string(),
            })
    };

    DeploymentPlan::builder()
        .then(DeploymentStep::new(DISTRIBUTOR, "DividendDistributor"))
        .then(
            DeploymentStep::new(STAKING, "Staking")
                .arg(named(STAKING, "ord")?)
                .output_of(DISTRIBUTOR),
        )
        .then(
            DeploymentStep::new(BUY_AND_BURN, "BuyAndBurn")
                .arg(named(BUY_AND_BURN, "ord")?)
                .arg(named(BUY_AND_BURN, "router")?),
        )
        .then(
            DeploymentStep::new(ADMIN, "Admin")
                .arg(named(ADMIN, "treasury")?)
                .output_of(BUY_AND_BURN)
                .output_of(DISTRIBUTOR)
                .arg(named(ADMIN, "router")?),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArgSource;

    fn addresses() -> BTreeMap<String, Address> {
        BTreeMap::from([
            ("ord".to_string(), Address::with_last_byte(0x01)),
            ("router".to_string(), Address::with_last_byte(0x02)),
            ("treasury".to_string(), Address::with_last_byte(0x03)),
        ])
    }

    #[test]
    fn test_staking_suite_order_and_args() {
        let plan = staking_suite(&addresses()).unwrap();
        let names: Vec<_> = plan.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, [DISTRIBUTOR, STAKING, BUY_AND_BURN, ADMIN]);

        let admin = &plan.steps()[3];
        assert_eq!(
            admin.args,
            vec![
                ArgSource::Static(ArgValue::Address(Address::with_last_byte(0x03))),
                ArgSource::Output(BUY_AND_BURN.into()),
                ArgSource::Output(DISTRIBUTOR.into()),
                ArgSource::Static(ArgValue::Address(Address::with_last_byte(0x02))),
            ]
        );
    }

    #[test]
    fn test_each_step_deploys_its_own_artifact() {
        let plan = staking_suite(&addresses()).unwrap();
        let contracts: Vec<_> = plan.steps().iter().map(|s| s.contract.as_str()).collect();
        assert_eq!(
            contracts,
            ["DividendDistributor", "Staking", "BuyAndBurn", "Admin"]
        );
    }

    #[test]
    fn test_missing_named_address() {
        let mut addresses = addresses();
        addresses.remove("treasury");

        let err = staking_suite(&addresses).unwrap_err();
        assert_eq!(
            err,
            PlanError::MissingAddress {
                step: ADMIN.into(),
                key: "treasury".to_string()
            }
        );
    }
}
