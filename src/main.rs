//! Binary entry point for the Snapwarden CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing::info;

use snapwarden::logging::init_logging;
use snapwarden::{AwsCliProvider, AwsError, ConfigError, RunSummary, SnapshotManager, SnapwardenConfig};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("could not set up the AWS client: {0}")]
    Provider(#[from] AwsError),
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let exit_code = match run(&cli) {
        Ok(summary) => {
            writeln!(io::stdout(), "{summary}").ok();
            0
        }
        Err(err) => {
            write_error(io::stderr(), &err);
            1
        }
    };

    process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<RunSummary, CliError> {
    let config = SnapwardenConfig::load_without_cli_args()?;
    let aws_settings = config.aws_settings(&cli.profile, cli.region.as_deref())?;
    let settings = config.run_settings(cli.retention_days, &cli.instance_ids, cli.dry_run())?;

    let (provider, identity) = AwsCliProvider::connect_with_process_runner(aws_settings)?;
    info!(
        account = %identity.account,
        arn = %identity.arn,
        region = %provider.settings().region,
        "connected to AWS"
    );

    Ok(SnapshotManager::new(provider, settings).run())
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["snapwarden", "--profile", "ops"], false)]
    #[case(&["snapwarden", "--profile", "ops", "--dry-run"], true)]
    #[case(&["snapwarden", "--profile", "ops", "--dry-run", "--no-dry-run"], false)]
    #[case(&["snapwarden", "--profile", "ops", "--no-dry-run", "--dry-run"], true)]
    fn last_dry_run_flag_wins(#[case] args: &[&str], #[case] expected: bool) {
        let cli = Cli::try_parse_from(args).expect("arguments should parse");
        assert_eq!(cli.dry_run(), expected);
    }

    #[rstest]
    fn instance_ids_split_on_commas() {
        let cli = Cli::try_parse_from([
            "snapwarden",
            "--profile",
            "ops",
            "--instance-ids",
            "i-1,i-2",
            "--region",
            "eu-west-1",
            "--retention-days",
            "7",
        ])
        .expect("arguments should parse");
        assert_eq!(cli.instance_ids, vec!["i-1", "i-2"]);
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cli.retention_days, Some(7));
    }

    #[rstest]
    #[case(&["snapwarden", "--region", "eu-west-1"])]
    #[case(&["snapwarden", "--profile", "ops", "--retention-days", "-1"])]
    fn invalid_arguments_are_rejected(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[rstest]
    fn write_error_renders_config_errors() {
        let mut buf = Vec::new();
        let err = CliError::Config(ConfigError::MissingField(String::from("aws_bin")));
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(rendered.starts_with("configuration error:"), "rendered: {rendered}");
    }
}
