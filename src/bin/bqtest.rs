//! BigQuery SQL test runner
//!
//! CLI tool that loads CSV fixtures into scratch tables, runs SQL queries
//! against them and compares the results with expected CSV output.
//!
//! Usage:
//!   bqtest run -c tests.yaml [-v] [--output json] [--test NAME]
//!   bqtest list -c tests.yaml

use bqtest::engine::{BigQueryClient, InMemoryEngine, QueryEngine};
use bqtest::test_harness::report::{write_report, OutputFormat};
use bqtest::test_harness::{EngineConfig, TestRunner, TestSuite};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "bqtest")]
#[command(about = "A CLI tool for running BigQuery tests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run BigQuery tests
    #[command(visible_alias = "r")]
    Run {
        /// Path to the test configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Engine endpoint (overrides BQTEST_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Project ID (overrides BQTEST_PROJECT)
        #[arg(long)]
        project: Option<String>,

        /// Timeout per query job in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Run only the test with this name
        #[arg(short, long)]
        test: Option<String>,

        /// Run against an in-process engine instead of BigQuery
        #[arg(long)]
        dry_run: bool,
    },

    /// List available tests
    #[command(visible_alias = "l")]
    List {
        /// Path to the test configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Run {
            config,
            verbose,
            output,
            endpoint,
            project,
            timeout_ms,
            test,
            dry_run,
        } => {
            let format: OutputFormat = output.parse()?;

            let suite = TestSuite::from_file(&config)
                .map_err(|e| format!("failed to parse test configuration: {}", e))?;
            suite
                .validate()
                .map_err(|e| format!("invalid test configuration: {}", e))?;

            let mut engine_config = EngineConfig::from_env()?;
            if let Some(ref endpoint) = endpoint {
                engine_config = engine_config.with_endpoint(endpoint);
            }
            if let Some(ref project) = project {
                engine_config = engine_config.with_project(project);
            }
            if let Some(ms) = timeout_ms {
                engine_config = engine_config.with_query_timeout(Duration::from_millis(ms));
            }

            let all_passed = if dry_run {
                run_suite(InMemoryEngine::new(), &suite, test.as_deref(), format, verbose).await?
            } else {
                let client = BigQueryClient::new(engine_config)
                    .map_err(|e| format!("failed to create test runner: {}", e))?;
                run_suite(client, &suite, test.as_deref(), format, verbose).await?
            };

            if !all_passed {
                std::process::exit(1);
            }
        }

        Commands::List { config } => {
            let suite = TestSuite::from_file(&config)
                .map_err(|e| format!("failed to parse test configuration: {}", e))?;

            println!("Available tests:");
            for test in &suite.tests {
                println!("- {}", test.name);
            }
        }
    }

    Ok(())
}

/// Run the suite on `engine`, print the report and close the engine.
/// Returns whether every test passed.
async fn run_suite<E: QueryEngine>(
    engine: E,
    suite: &TestSuite,
    only: Option<&str>,
    format: OutputFormat,
    verbose: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let runner = TestRunner::new(engine, &suite.dataset);
    let result = runner.run_suite(suite, only).await;

    if let Err(e) = runner.close().await {
        log::warn!("Failed to close engine: {}", e);
    }

    let report = result?;
    let stdout = std::io::stdout();
    write_report(&report, format, verbose, &mut stdout.lock())?;

    Ok(report.all_passed())
}
