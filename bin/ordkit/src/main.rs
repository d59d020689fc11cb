//! ordkit deploys the ORD staking contracts to PulseChain, one confirmed contract at a time.

mod cli;

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use ordkit_deploy::{
    CONFIG_FILENAME, Credential, DeployConfig, DeploymentPlan, DeploymentReport, Orchestrator,
    ProgressRecord, RpcChainClient, staking_suite,
};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr, progress records to stdout.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config_path = cli.config.clone().or_else(|| {
        Path::new(CONFIG_FILENAME)
            .exists()
            .then(|| PathBuf::from(CONFIG_FILENAME))
    });

    let mut config = DeployConfig::load(config_path.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let plan = staking_suite(&config.addresses).context("Failed to build the deployment plan")?;

    if cli.dry_run {
        print_plan(&config, &plan);
        return Ok(0);
    }

    if config.report.enabled {
        let path = config.save_to_dir(&config.report.dir)?;
        tracing::debug!(path = %path.display(), "Effective configuration saved");
    }

    let credential = Credential::from_env(&cli.credential_env)?;
    let client = RpcChainClient::connect(&config, credential).await?;

    tracing::info!(
        network = %config.network.name,
        chain_id = client.chain_id(),
        sender = %client.sender(),
        steps = plan.len(),
        fingerprint = %plan.fingerprint(),
        "Deploying contracts..."
    );

    let outcome = Orchestrator::new(client)
        .confirmation_timeout(config.confirmation.timeout())
        .run_with(&plan, |record| {
            let _ = print_progress(record, &mut io::stdout(), &mut io::stderr());
        })
        .await;

    let report = DeploymentReport::new(&config, &plan, &outcome);
    eprintln!("{}", report.summary_table());

    if config.report.enabled {
        if let Err(err) = report.save_to_dir(&config.report.dir) {
            tracing::error!(error = %err, "Failed to save deployment report");
        }
    }

    Ok(outcome.exit_status())
}

/// Deployed steps go to stdout. A failure goes to stderr once and carries the cause.
fn print_progress(
    record: &ProgressRecord<'_>,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> io::Result<()> {
    match record {
        ProgressRecord::Deployed(_) => writeln!(stdout, "{record}"),
        ProgressRecord::Failed(_) => writeln!(stderr, "{record}"),
    }
}

fn print_plan(config: &DeployConfig, plan: &DeploymentPlan) {
    println!(
        "Plan {} for {} (chain {}), {} steps:",
        plan.fingerprint(),
        config.network.name,
        config.network.chain_id,
        plan.len()
    );

    for (index, step) in plan.steps().iter().enumerate() {
        let args = step
            .args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}. {}: {}({})", index + 1, step.name, step.contract, args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordkit_deploy::{ChainError, StepError};

    #[test]
    fn test_failure_printed_once_to_stderr() {
        let error = StepError::new(
            "BuyAndBurn".into(),
            ChainError::Submission("insufficient funds".to_string()),
        );
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        print_progress(&ProgressRecord::Failed(&error), &mut stdout, &mut stderr).unwrap();

        assert!(stdout.is_empty());
        let stderr = String::from_utf8(stderr).unwrap();
        assert_eq!(stderr.lines().count(), 1);
        assert_eq!(stderr.matches("insufficient funds").count(), 1);
        assert!(stderr.starts_with("BuyAndBurn - Failed: "));
    }
}
