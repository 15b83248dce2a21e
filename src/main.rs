use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use schedula::client::SolverClient;
use schedula::config::SchedulaConfig;
use schedula::display::print_grid;
use schedula::export::{export_csv_with, export_template, TemplateKind};
use schedula::schedule::{build_grid, build_grid_strict};
use schedula::session::{Submission, UploadedFile};
use schedula::web;

/// Course scheduling client.
///
/// Example:
///   schedula solve rooms.txt courses.txt --csv schedule.csv
#[derive(Debug, Parser)]
#[command(name = "schedula", about = "Schedula course scheduling client", long_about = None)]
struct Cli {
    /// YAML configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Solver endpoint, overrides the configuration file and environment.
    #[arg(long = "solver-url", global = true)]
    solver_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the web front end.
    Serve {
        #[arg(short = 'p', long)]
        port: Option<u16>,
        #[arg(short = 'b', long)]
        bind: Option<String>,
    },
    /// Send two input files to the solver and print the resulting grid.
    Solve {
        /// Rooms, courses and time slots.
        file1: PathBuf,
        /// Enrollments and preferences.
        file2: PathBuf,
        /// Also write the schedule as CSV to this path.
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Fail when two courses share a room and time.
        #[arg(long)]
        strict: bool,
    },
    /// Write one of the input file templates.
    Template {
        /// format1 or format2
        kind: TemplateKind,
        /// Target directory.
        #[arg(short = 'o', long, default_value = ".")]
        out: PathBuf,
    },
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let bytes = std::fs::read(path).with_context(|| format!("Cannot read input file: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(name, bytes))
}

async fn solve(config: &SchedulaConfig, file1: &Path, file2: &Path, csv: Option<&Path>, strict: bool) -> Result<()> {
    let submission = Submission::new(read_upload(file1)?, read_upload(file2)?);
    let client = SolverClient::new(&config.solver)?;

    let records = match client.submit(&submission).await {
        Ok(Some(records)) => records,
        Ok(None) => bail!("solver produced no schedule"),
        Err(e) => return Err(e).context("Error submitting files"),
    };
    info!("Received {} assignment(s)", records.len());

    let grid = if strict || config.strict_duplicates {
        build_grid_strict(&records)?
    } else {
        build_grid(&records)
    };
    print_grid(&grid);

    if let Some(path) = csv {
        let download = export_csv_with(&records, config.export.csv_style)?;
        let file = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
        download.write_to(file)?;
        println!("\nSchedule saved to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Level is controlled by RUST_LOG (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = SchedulaConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.solver_url {
        config.solver.url = url;
    }

    let result = match cli.command {
        Command::Serve { port, bind } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            web::start_server(config).await
        }
        Command::Solve { file1, file2, csv, strict } => {
            solve(&config, &file1, &file2, csv.as_deref(), strict).await
        }
        Command::Template { kind, out } => export_template(kind)
            .save_in(&out)
            .map(|path| println!("Template written to {}", path.display()))
            .map_err(Into::into),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
