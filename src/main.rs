// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use acm_dfu_test::cable::CableType;
use acm_dfu_test::error::HarnessError;
use acm_dfu_test::harness::PreparedRun;
use acm_dfu_test::output::Config;
use acm_dfu_test::settings::Settings;
use acm_dfu_test::tool::ProcessInvoker;
use acm_dfu_test::trial::TrialFailure;

#[derive(Parser)]
#[command(name = "acm-dfu-test")]
#[command(version, about = "Active cable firmware update stress test")]
#[command(propagate_version = true)]
struct Cli {
    /// Console log level
    #[arg(
        long,
        global = true,
        env = "ACM_DFU_TEST_LOG",
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run update trials against one attached cable
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Cable under test: ure, utt or upp12
    #[arg(long)]
    cable_type: String,

    /// Directory holding one sub-directory of images per firmware component
    #[arg(long)]
    dfu_directory: PathBuf,

    /// Settings file (TOML)
    #[arg(short, long, env = "ACM_DFU_TEST_CONFIG")]
    config: Option<PathBuf>,

    /// Run log, appended to as JSON lines
    #[arg(long, default_value = "acm_dfu_test.log")]
    log_file: PathBuf,

    /// Number of trials, overriding the settings file
    #[arg(long)]
    trials: Option<u32>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&cli.log_level)
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let code = match cli.command {
        Commands::Run(args) => run(args).await,
    };
    std::process::exit(code);
}

async fn run(args: RunArgs) -> i32 {
    let cable = match args.cable_type.parse::<CableType>() {
        Ok(cable) => cable,
        Err(e) => return abort(&HarnessError::from(e)),
    };

    let mut settings = match &args.config {
        Some(path) => match Settings::load_from(path).await {
            Ok(settings) => settings,
            Err(e) => return abort(&HarnessError::from(e)),
        },
        None => Settings::default(),
    };
    if let Some(trials) = args.trials {
        settings.trials = trials;
    }

    let prepared = match PreparedRun::new(cable, &args.dfu_directory, settings) {
        Ok(prepared) => prepared,
        Err(e) => return abort(&HarnessError::from(e)),
    };

    let output = match Config::builder().with_file_output(&args.log_file).await {
        Ok(builder) => builder.build(),
        Err(e) => {
            return abort(&HarnessError::Io {
                context: "failed to open run log",
                path: args.log_file.clone(),
                source: e,
            })
        }
    };

    match prepared.execute(&ProcessInvoker::new(), output).await {
        Ok(summary) => {
            if let Some(failure) = &summary.failure {
                report_failure(failure);
            } else {
                println!("{} of {} trials passed", summary.passed, summary.requested);
            }
            summary.exit_code()
        }
        Err(e) => abort(&e),
    }
}

fn report_failure(failure: &TrialFailure) {
    if !failure.diagnostics.is_empty() {
        eprintln!("{}", failure.diagnostics);
    }
    eprintln!(
        "{:?} failed: {} (exit status {})",
        failure.phase,
        failure.error,
        failure.error.exit_code()
    );
    eprintln!("aborting run");
}

fn abort(e: &HarnessError) -> i32 {
    error!(error = %e, "aborting run");
    e.exit_code()
}
