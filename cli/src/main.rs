//! fieldpdf CLI - form export tool

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use fieldpdf::{
    build_segments, infer_orientation, render_document, DeclarativeDocument, DirectorySink,
    DraftRasterizer, EmailStatus, ExportConfig, ExportOptions, ExportPipeline, ExportResult,
    HttpMailRelay, Page, RelayConfig,
};
use fieldpdf::export::{DEFAULT_RELAY_BASE_URL, DEFAULT_RELAY_TOKEN};

#[derive(Parser)]
#[command(name = "fieldpdf")]
#[command(author = "fieldpdf contributors")]
#[command(version)]
#[command(about = "Export field-operations forms to PDF and deliver them by email", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture an element of a page snapshot, save it and optionally email it
    Export {
        /// Page snapshot (JSON visual tree)
        #[arg(value_name = "PAGE")]
        input: PathBuf,

        /// Id of the element to export
        #[arg(short, long, default_value = "report")]
        element: String,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// File name (".pdf" is appended when missing)
        #[arg(short, long)]
        filename: Option<String>,

        /// Recipient address; no email is sent when omitted
        #[arg(long, env = "FIELDPDF_TO")]
        to: Option<String>,

        /// Extra message for the email body
        #[arg(short, long)]
        message: Option<String>,

        /// Page orientation (inferred from table widths when omitted)
        #[arg(long, value_enum)]
        orientation: Option<OrientationArg>,

        /// Mail relay base URL
        #[arg(long, env = "RELAY_BASE_URL")]
        relay_url: Option<String>,

        /// Mail relay bearer token
        #[arg(long, env = "RELAY_TOKEN", hide_env_values = true)]
        relay_token: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a declarative document to PDF
    Render {
        /// Declarative document (JSON)
        #[arg(value_name = "DOC")]
        input: PathBuf,

        /// Output file (defaults to the input name with .pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page orientation (defaults to the document's own, then portrait)
        #[arg(long, value_enum)]
        orientation: Option<OrientationArg>,

        /// Page margin in millimetres
        #[arg(long, default_value = "10")]
        margin: f32,
    },

    /// Show how an element would be segmented
    Segments {
        /// Page snapshot (JSON visual tree)
        #[arg(value_name = "PAGE")]
        input: PathBuf,

        /// Id of the element to inspect
        #[arg(short, long, default_value = "report")]
        element: String,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OrientationArg {
    /// Tall pages
    Portrait,
    /// Wide pages
    Landscape,
}

impl From<OrientationArg> for fieldpdf::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => fieldpdf::Orientation::Portrait,
            OrientationArg::Landscape => fieldpdf::Orientation::Landscape,
        }
    }
}

struct ExportArgs {
    input: PathBuf,
    element: String,
    output: PathBuf,
    filename: Option<String>,
    to: Option<String>,
    message: Option<String>,
    orientation: Option<OrientationArg>,
    relay_url: Option<String>,
    relay_token: Option<String>,
    json: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Export {
            input,
            element,
            output,
            filename,
            to,
            message,
            orientation,
            relay_url,
            relay_token,
            json,
        }) => cmd_export(ExportArgs {
            input,
            element,
            output,
            filename,
            to,
            message,
            orientation,
            relay_url,
            relay_token,
            json,
        }),
        Some(Commands::Render {
            input,
            output,
            orientation,
            margin,
        }) => cmd_render(&input, output.as_deref(), orientation, margin),
        Some(Commands::Segments { input, element }) => cmd_segments(&input, &element),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: fieldpdf export <PAGE> --element <ID> [--to <EMAIL>]".yellow());
            println!("       fieldpdf --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Relay settings from the command line (clap already folds in
/// `RELAY_BASE_URL` / `RELAY_TOKEN`), with the built-in defaults for
/// anything still missing.
fn relay_config(url: Option<String>, token: Option<String>) -> RelayConfig {
    let present = |v: Option<String>| v.filter(|v| !v.trim().is_empty());
    let base_url = present(url).unwrap_or_else(|| DEFAULT_RELAY_BASE_URL.to_string());
    let token = present(token).unwrap_or_else(|| {
        log::warn!("no relay token given, using the built-in token");
        DEFAULT_RELAY_TOKEN.to_string()
    });
    RelayConfig::new(base_url, token).with_timeout(Duration::from_secs(30))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn cmd_export(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut page = Page::open(&args.input)?;
    fs::create_dir_all(&args.output)?;

    let filename = args.filename.unwrap_or_else(|| {
        args.input
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    });
    let mut options = ExportOptions::new(filename);
    options.to = args.to;
    options.additional_message = args.message;
    options.orientation = args.orientation.map(Into::into);

    let config = ExportConfig::default();
    let overlay_message = config.overlay_message.clone();
    let relay = HttpMailRelay::new(relay_config(args.relay_url, args.relay_token))?;
    let pipeline = ExportPipeline::new(
        Arc::new(DraftRasterizer::new()),
        Arc::new(DirectorySink::new(&args.output)),
        Arc::new(relay),
    )
    .with_config(config)
    .with_status_tracking();

    let pb = spinner();
    pb.set_message(overlay_message);

    let rt = tokio::runtime::Runtime::new()?;
    let result: ExportResult = rt.block_on(async {
        if let Some(status) = pipeline.status() {
            let mut rx = status.subscribe();
            let progress = pb.clone();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let status = rx.borrow_and_update().clone();
                    if status != EmailStatus::Idle {
                        progress.set_message(status.display_text());
                    }
                }
            });
        }
        pipeline.export_capture(&mut page, &args.element, &options).await
    })?;

    pb.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Saved to".green(),
        args.output.join(options.file_name()).display()
    );
    match (&options.to, &result.email_error) {
        (None, _) => println!("{}", "No recipient, email skipped".dimmed()),
        (Some(to), None) => {
            print!("{} {}", "Emailed to".green(), to);
            if let Some(id) = &result.email_id {
                print!(" ({})", id.dimmed());
            }
            println!();
        }
        (Some(to), Some(error)) => {
            println!("{} {}: {}", "Email to".yellow(), to, error.red());
        }
    }

    Ok(())
}

fn cmd_render(
    input: &Path,
    output: Option<&Path>,
    orientation: Option<OrientationArg>,
    margin: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = DeclarativeDocument::open(input)?;
    let bytes = render_document(&doc, orientation.map(Into::into), margin)?;

    let path = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| input.with_extension("pdf"));
    fs::write(&path, &bytes)?;
    println!(
        "{} {} ({} bytes)",
        "Saved to".green(),
        path.display(),
        bytes.len()
    );

    Ok(())
}

fn cmd_segments(input: &Path, element: &str) -> Result<(), Box<dyn std::error::Error>> {
    let page = Page::open(input)?;
    let root = page
        .find_by_id(element)
        .ok_or_else(|| fieldpdf::Error::CaptureTargetMissing(element.to_string()))?;

    let config = ExportConfig::default();
    let segments = build_segments(root, &config.no_export_class);
    let orientation = infer_orientation(
        root,
        &config.no_export_class,
        config.landscape_column_threshold,
    );

    println!("{}", "Segments".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for (i, segment) in segments.iter().enumerate() {
        let marker = if i + 1 == segments.len() { "└─" } else { "├─" };
        println!("  {} {}", marker.dimmed(), segment);
    }
    println!();
    println!("{}: {:?}", "Orientation".bold(), orientation);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "fieldpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Form export pipeline (library {})", fieldpdf::VERSION);
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_prefers_given_values() {
        let config = relay_config(Some("https://relay.example.com".into()), Some("secret".into()));
        assert_eq!(config.base_url, "https://relay.example.com");
        assert_eq!(config.token, "secret");
    }

    #[test]
    fn test_relay_config_blank_values_use_defaults() {
        let config = relay_config(Some("  ".into()), None);
        assert_eq!(config.base_url, DEFAULT_RELAY_BASE_URL);
        assert_eq!(config.token, DEFAULT_RELAY_TOKEN);
    }
}
