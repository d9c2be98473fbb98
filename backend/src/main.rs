//! Rosterload CLI - Bulk import of client email lists
//!
//! # Commands
//!
//! ```bash
//! rosterload serve                          # Start HTTP server (port 3000)
//! rosterload preview clients.csv            # Validate a file, nothing is sent
//! rosterload import clients.csv -r out.csv  # Link every valid email, write a report
//! rosterload template -o sample.csv         # Write the sample file
//! ```
//!
//! Without `--roster`, the connected emails are fetched from the client
//! directory configured by `ROSTERLOAD_API_URL`.

use clap::{Parser, Subcommand};
use rosterload::{
    config::Config,
    directory::{HttpClientDirectory, RosterSource},
    import::{report_csv, template_csv, Executor, ImportSession, RowUpdate, TEMPLATE_FILENAME},
    models::ImportRow,
    validation::Roster,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rosterload")]
#[command(about = "Bulk import of client email lists into a practice roster", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: ROSTERLOAD_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Parse and validate a file without importing anything
    Preview {
        /// Input file (.csv or .txt)
        input: PathBuf,

        /// File with the already connected emails, one per line
        #[arg(short, long)]
        roster: Option<PathBuf>,
    },

    /// Validate a file, then link every valid email
    Import {
        /// Input file (.csv or .txt)
        input: PathBuf,

        /// File with the already connected emails, one per line
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Write a CSV report of every row
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Pause between two directory calls, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Write the sample import file
    Template {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(port).await,

        Commands::Preview { input, roster } => cmd_preview(&input, roster.as_deref()).await,

        Commands::Import {
            input,
            roster,
            report,
            delay_ms,
        } => cmd_import(&input, roster.as_deref(), report.as_deref(), delay_ms).await,

        Commands::Template { output } => cmd_template(output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    rosterload::server::start_server(config).await
}

fn directory(config: &Config) -> Arc<HttpClientDirectory> {
    Arc::new(HttpClientDirectory::new(config.api_url.clone()).with_token(config.api_token.clone()))
}

async fn load_roster(
    path: Option<&Path>,
    directory: &HttpClientDirectory,
) -> Result<Roster, Box<dyn std::error::Error>> {
    let roster = match path {
        Some(p) => Roster::from_lines(&fs::read_to_string(p)?),
        None => {
            eprintln!("   Fetching roster from {}", directory.base_url());
            directory.fetch_roster().await?
        }
    };
    eprintln!("   Roster: {} connected client(s)", roster.len());
    Ok(roster)
}

/// Read the file and move a fresh session to preview.
async fn load_session(
    input: &Path,
    roster_path: Option<&Path>,
    directory: &HttpClientDirectory,
) -> Result<ImportSession, Box<dyn std::error::Error>> {
    eprintln!("📄 Reading: {}", input.display());

    let roster = load_roster(roster_path, directory).await?;
    let bytes = fs::read(input)?;
    let file_name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let mut session = ImportSession::new();
    session.load_file(file_name, &bytes, &roster)?;
    Ok(session)
}

fn print_rows(rows: &[ImportRow]) {
    for row in rows {
        println!(
            "{:>5}  {:<9}  {:<40}  {}",
            row.original_line_number,
            row.status.as_str(),
            row.email(),
            row.message
        );
    }
}

async fn cmd_preview(input: &Path, roster: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let session = load_session(input, roster, &directory(&config)).await?;

    print_rows(session.rows());
    eprintln!(
        "\n📊 {} row(s), {} ready to import",
        session.rows().len(),
        session.valid_count()
    );
    Ok(())
}

async fn cmd_import(
    input: &Path,
    roster: Option<&Path>,
    report: Option<&Path>,
    delay_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let directory = directory(&config);
    let mut session = load_session(input, roster, &directory).await?;

    let mut options = config.executor_options();
    if let Some(ms) = delay_ms {
        options.row_delay = Duration::from_millis(ms);
    }
    let executor = Executor::new(directory).with_options(options);

    eprintln!("\n⚙️  Importing {} email(s)", session.valid_count());
    let mut progress = |update: &RowUpdate| {
        eprintln!(
            "   [{:>3}%] {} → {}: {}",
            update.progress_percent,
            update.row.email(),
            update.row.status,
            update.row.message
        );
    };
    let summary = session.run_import(&executor, &mut progress).await?;

    print_rows(session.rows());
    eprintln!("\n📊 Results:");
    eprintln!("   ✅ Added: {}", summary.successful);
    eprintln!("   ❌ Failed: {}", summary.failed);
    eprintln!("   Duplicates: {}", summary.duplicates);
    eprintln!("   Invalid: {}", summary.invalid);

    if let Some(path) = report {
        fs::write(path, report_csv(session.rows())?)?;
        eprintln!("   💾 Report saved to: {}", path.display());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_template(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = template_csv();
    match output {
        Some(p) => {
            fs::write(p, &content)?;
            eprintln!("💾 Template written to: {}", p.display());
        }
        None => {
            eprintln!("# {}", TEMPLATE_FILENAME);
            print!("{}", content);
        }
    }
    Ok(())
}
