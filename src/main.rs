use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use zh_wordfreq::config::{Config, GlobalOpts};
use zh_wordfreq::pipeline::{Pipeline, Report};
use zh_wordfreq::utils;
use zh_wordfreq::visualizer::ChartKind;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prompt for URLs and chart types until an empty URL is entered (default)
    Interactive,
    /// Analyze one page and render one chart
    Analyze {
        /// Page containing Chinese text
        #[arg(short, long)]
        url: String,

        /// Chart to render
        #[arg(short, long, value_enum, default_value = "word-cloud")]
        chart: ChartKind,

        /// Output file for the chart (default: <output-dir>/<host>-<chart>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also export the ranking as JSON to this file
        #[arg(short, long)]
        json: Option<PathBuf>,
    },
    /// Render a chart from a ranking exported with `analyze --json`
    Render {
        /// Input JSON file with analysis results
        #[arg(short, long)]
        input: PathBuf,

        /// Chart to render
        #[arg(short, long, value_enum, default_value = "word-cloud")]
        chart: ChartKind,

        /// Output file for the chart
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_opts(&cli.opts).context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let pipeline = Pipeline::from_config(&config).context("Failed to set up the pipeline")?;
    if let Ok(font) = pipeline.fonts().resource() {
        tracing::info!(font = %font.path().display(), "raster charts enabled");
    }

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => run_interactive(&pipeline, &config),
        Commands::Analyze {
            url,
            chart,
            output,
            json,
        } => {
            let report = with_spinner(&url, || pipeline.run(&url, chart))
                .with_context(|| format!("Failed to chart {}", url))?;

            utils::print_ranking(&report.results);

            if let Some(json_path) = json {
                utils::export_to_json(&report.results, &json_path)
                    .context("Failed to export results to JSON")?;
                println!("Results exported to {}", json_path.display());
            }

            let path = save_report(&report, chart, output.as_deref(), &config)?;
            println!("{} saved to {}", chart, path.display());
            Ok(())
        }
        Commands::Render {
            input,
            chart,
            output,
        } => {
            let results = utils::import_from_json(&input)
                .context("Failed to import analysis results")?;

            let artifact = pipeline
                .render(&results.top_words, chart)
                .context("Failed to generate visualization")?;

            let path = output.unwrap_or_else(|| {
                utils::default_output_path(&config.output_dir, &results.source, chart, &artifact)
            });
            utils::write_artifact(&artifact, &path)?;
            println!("{} saved to {}", chart, path.display());
            Ok(())
        }
    }
}

fn run_interactive(pipeline: &Pipeline, config: &Config) -> Result<()> {
    println!("{}", "=== 中文文本分析工具 ===".bold().green());
    if !pipeline.fonts().is_ready() {
        println!(
            "{}",
            "No usable CJK font configured; Word Cloud and Bar Chart (static) will fail. Use --font."
                .yellow()
        );
    }

    let labels: Vec<&str> = ChartKind::ALL.iter().map(|k| k.label()).collect();

    loop {
        let url: String = Input::new()
            .with_prompt("URL to analyze (empty to quit)")
            .allow_empty(true)
            .interact_text()?;
        let url = url.trim().to_string();
        if url.is_empty() {
            break;
        }

        let choice = Select::new()
            .with_prompt("Chart type")
            .items(&labels)
            .default(0)
            .interact()?;
        let chart = ChartKind::ALL[choice];

        // Errors end this request only; the prompt comes back.
        match with_spinner(&url, || pipeline.run(&url, chart)) {
            Ok(report) => {
                utils::print_ranking(&report.results);
                match save_report(&report, chart, None, config) {
                    Ok(path) => println!("\n{} saved to {}\n", chart, path.display().to_string().bold()),
                    Err(e) => eprintln!("{} {:#}\n", "Error:".red().bold(), e),
                }
            }
            Err(e) => {
                tracing::debug!(error = ?e, "request failed");
                eprintln!("{} {}\n", "Error:".red().bold(), e);
            }
        }
    }

    Ok(())
}

fn with_spinner<T>(url: &str, work: impl FnOnce() -> T) -> T {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Analyzing {}", url));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = work();
    pb.finish_and_clear();
    result
}

fn save_report(report: &Report, chart: ChartKind, output: Option<&Path>, config: &Config) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => utils::default_output_path(
            &config.output_dir,
            &report.results.source,
            chart,
            &report.artifact,
        ),
    };
    utils::write_artifact(&report.artifact, &path)?;
    Ok(path)
}
