use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use game_ledger::config::Config;
use game_ledger::ledger::{first_license_per_app, parse_ledger};
use game_ledger::logging::init_logging;
use game_ledger::pipeline::SteamPipeline;
use game_ledger::sources::LedgerSource;
use game_ledger::steamcmd::{LedgerFile, LedgerReader};
use game_ledger::Report;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use tracing::info;

#[derive(Parser)]
#[command(name = "game-ledger")]
#[command(about = "Fuse a game library with its price book, achievements and license ledger")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./game-ledger.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and print a summary
    Report {
        /// Also write the rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the flat cell list as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },
    /// Run the pipeline and write the account-keyed JSON document
    Json {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse the license ledger and list the licenses
    Licenses {
        /// Read a saved ledger instead of the configured source
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Report {
        csv: None,
        json: false,
    });
    let json = matches!(
        command,
        Commands::Report { json: true, .. } | Commands::Json { .. }
    );

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return handle_error(e.into(), json),
    };

    let _guard = match init_logging(&config.logging, &config.paths.log_directory) {
        Ok(guard) => guard,
        Err(e) => return handle_error(e, json),
    };

    let outcome = match command {
        Commands::Report { csv, json } => run_report(&config, csv, json).await,
        Commands::Json { output } => run_json(&config, output).await,
        Commands::Licenses { file } => run_licenses(&config, file).await,
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(e) => handle_error(e, json),
    }
}

async fn build_report(config: &Config) -> Result<Report> {
    SteamPipeline::from_config(config)?.run().await
}

async fn run_report(config: &Config, csv: Option<PathBuf>, json: bool) -> Result<()> {
    let report = build_report(config).await?;

    if let Some(path) = csv {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        report.write_csv(BufWriter::new(file))?;
        info!(file = %path.display(), rows = report.len(), "CSV written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report.cells())?);
    } else {
        report.display_summary(&config.steam.steam_id);
    }
    Ok(())
}

async fn run_json(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let report = build_report(config).await?;
    let document = report.account_document(&config.steam.steam_id);
    let content = serde_json::to_string_pretty(&document)?;

    match output {
        Some(path) => {
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;
            info!(file = %path.display(), games = report.len(), "JSON document written");
        }
        None => println!("{}", content),
    }
    Ok(())
}

async fn run_licenses(config: &Config, file: Option<PathBuf>) -> Result<()> {
    let lines = match file {
        Some(path) => LedgerFile::new(path).ledger_lines().await?,
        None => {
            LedgerReader::from_config(&config.ledger, &config.steam.login)
                .ledger_lines()
                .await?
        }
    };

    let licenses = parse_ledger(&lines).context("Failed to parse license ledger")?;
    let apps = first_license_per_app(&licenses).len();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for license in &licenses {
        let app_ids: Vec<String> = license.app_ids.iter().map(|id| id.to_string()).collect();
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            license.package_id,
            license.acquired.format(game_ledger::report::ACQUIRED_FORMAT),
            license.location,
            license.kind,
            app_ids.join(",")
        )?;
    }
    writeln!(out, "{} licenses covering {} apps", licenses.len(), apps)?;
    Ok(())
}

fn handle_error(e: anyhow::Error, json: bool) -> Result<(), anyhow::Error> {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
