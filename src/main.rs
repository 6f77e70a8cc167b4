use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dashplot::config::DashboardConfig;
use dashplot::parser;
use dashplot::session::{Session, SessionEvent};
use dashplot::shell::Shell;
use dashplot::OutputFormat;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Svg,
}

#[derive(Parser, Debug)]
#[command(name = "dashplot")]
#[command(about = "Explore CSV data and render dashboard charts from a command script", long_about = None)]
struct Args {
    /// Command script (e.g., 'load(sample) | set(chart: forest, group: Region) | render()')
    script: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Image format when the output path does not decide it
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Write rendered images here instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Disable the forest plot capability
    #[arg(long)]
    no_forest_plot: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if let Some(format) = args.format {
        config.render.format = match format {
            Format::Png => OutputFormat::Png,
            Format::Svg => OutputFormat::Svg,
        };
    }
    if args.no_forest_plot {
        config.forest_plot = false;
    }

    // Parse the whole script before running any of it
    let pipeline = match parser::parse_script(&args.script) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    };

    let session = Session::new(&config);
    session.subscribe(Box::new(|event| {
        if let SessionEvent::Notice(message) = event {
            eprintln!("notice: {}", message);
        }
    }));

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let report = Shell::new(&session, config.render.clone())
        .with_preview_rows(config.preview_rows)
        .with_output(args.output.clone())
        .run(&pipeline, &mut handle);

    if report.executed == 0 {
        eprintln!("Nothing to do: the script is empty");
    }

    io::Write::flush(&mut handle).context("Failed to flush stdout")?;
    Ok(())
}
