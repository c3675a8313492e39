//! pdfpyramid CLI - tile pyramid generator for PDF drawings

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfpyramid::pipeline::DEFAULT_OUTPUT_ROOT;
use pdfpyramid::{
    compress_tiles, plan_from_params, CancellationToken, CompressionReport, DistanceUnit, Error,
    GeometryParams, InvocationParams, PdfiumRasterizer, PipelineOptions, PipelineReport,
    ProgressSink, RenderConfig, Result, SchedulerOptions, StatsSnapshot, TilePipeline,
};

#[derive(Parser)]
#[command(name = "pdfpyramid")]
#[command(version)]
#[command(about = "Render PDF drawings into multi-resolution tile pyramids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a PDF into PNG tiles and compress them to WebP
    #[command(alias = "gen")]
    Generate {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        geometry: GeometryArgs,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short = 'j', long, env = "PDFPYRAMID_THREADS")]
        threads: Option<String>,

        /// Output root directory
        #[arg(short, long, value_name = "DIR", env = "PDFPYRAMID_OUTPUT", default_value = DEFAULT_OUTPUT_ROOT)]
        output: PathBuf,

        /// Stop at the first tile that fails to render
        #[arg(long)]
        abort_on_failure: bool,

        /// Keep PNG tiles only
        #[arg(long)]
        no_webp: bool,

        /// Directory containing the pdfium library
        #[arg(long, value_name = "DIR", env = "PDFIUM_LIB_DIR")]
        pdfium_dir: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the zoom levels a run would produce
    Plan {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compress `<DIR>/png` tiles into `<DIR>/webp`
    Compress {
        /// Document output directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// List accepted distance units
    Units,

    /// Show version information
    Version,
}

/// Document geometry, kept as text until validation.
#[derive(Args)]
struct GeometryArgs {
    /// Document width in document units
    #[arg(long)]
    width: String,

    /// Document height in document units
    #[arg(long)]
    height: String,

    /// Real-world length shown by the reference pixel span
    #[arg(long, value_name = "VALUE")]
    reference_size: String,

    /// Unit of the reference size
    #[arg(long)]
    unit: String,

    /// Document units in one meter
    #[arg(long, value_name = "VALUE")]
    units_per_meter: String,

    /// Tile edge length in pixels
    #[arg(long, value_name = "PX")]
    tile_size: Option<String>,

    /// Pixels spanned by the reference size at native resolution
    #[arg(long, value_name = "PX")]
    reference_pixels: Option<String>,

    /// Keep only the N finest levels
    #[arg(long, value_name = "N")]
    max_levels: Option<String>,
}

impl From<GeometryArgs> for GeometryParams {
    fn from(args: GeometryArgs) -> Self {
        GeometryParams {
            width: args.width,
            height: args.height,
            reference_value: args.reference_size,
            unit: args.unit,
            units_per_meter: args.units_per_meter,
            tile_resolution: args.tile_size,
            reference_pixels: args.reference_pixels,
            max_levels: args.max_levels,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = parse_cli();

    let result = match cli.command {
        Commands::Generate {
            input,
            geometry,
            threads,
            output,
            abort_on_failure,
            no_webp,
            pdfium_dir,
            json,
        } => {
            let params = InvocationParams {
                document: input,
                geometry: geometry.into(),
                concurrency: threads,
            };
            let flags = GenerateFlags {
                output,
                abort_on_failure,
                no_webp,
                pdfium_dir,
                json,
            };
            cmd_generate(&params, &flags)
        }
        Commands::Plan { geometry, json } => cmd_plan(geometry.into(), json),
        Commands::Compress { dir } => cmd_compress(&dir),
        Commands::Units => {
            cmd_units();
            Ok(())
        }
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

/// Parse arguments, reporting usage errors with the validation status.
fn parse_cli() -> Cli {
    let err = match Cli::try_parse() {
        Ok(cli) => return cli,
        Err(err) => err,
    };

    if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        err.exit();
    }

    let _ = err.print();
    if is_missing_unit(&err) {
        eprintln!(
            "Please choose a unit from the following ones: {}",
            DistanceUnit::names()
        );
    }
    std::process::exit(Error::Validation(String::new()).exit_code());
}

fn is_missing_unit(err: &clap::Error) -> bool {
    if err.kind() != ErrorKind::MissingRequiredArgument {
        return false;
    }
    match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::Strings(args)) => args.iter().any(|arg| arg.starts_with("--unit ")),
        _ => false,
    }
}

struct GenerateFlags {
    output: PathBuf,
    abort_on_failure: bool,
    no_webp: bool,
    pdfium_dir: Option<PathBuf>,
    json: bool,
}

/// Progress bar fed by the scheduler.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} tiles ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, stats: &StatsSnapshot) {
        self.bar.set_length(stats.total);
        self.bar.set_position(stats.processed());
        self.bar
            .set_message(format!("{} blank, {} failed", stats.elided, stats.failed));
    }

    fn on_finish(&self, stats: &StatsSnapshot) {
        self.bar.set_position(stats.processed());
        self.bar.finish_with_message("Rendered");
    }
}

fn cmd_generate(params: &InvocationParams, flags: &GenerateFlags) -> Result<()> {
    let validated = params.validate()?;
    let document = validated.geometry.document;

    let mut config = RenderConfig::new(&validated.document, document.tile_resolution);
    if let Some(dir) = &flags.pdfium_dir {
        config = config.with_library_dir(dir);
    }
    let rasterizer = PdfiumRasterizer::new(config)?;

    let mut scheduler = SchedulerOptions::new().with_concurrency(validated.concurrency);
    if flags.abort_on_failure {
        scheduler = scheduler.abort_on_first_failure();
    }
    let mut options = PipelineOptions::new()
        .with_output_root(&flags.output)
        .with_pyramid(validated.geometry.pyramid)
        .with_scheduler(scheduler);
    if flags.no_webp {
        options = options.skip_compression();
    }

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| Error::Other(format!("Cannot install Ctrl-C handler: {}", e)))?;

    let pipeline = TilePipeline::new(Arc::new(rasterizer), options).with_cancellation(token);
    let plan = pipeline.plan(&document);

    println!("{} {}", "Rendering".cyan().bold(), validated.document.display());
    println!(
        "  {} levels, {} tiles of {} px, {} threads",
        plan.levels().len(),
        plan.total_tiles(),
        plan.tile_resolution(),
        validated.concurrency
    );

    let progress = BarProgress::new(plan.total_tiles());
    let report = pipeline.run(&validated.document, &document, &progress)?;

    if flags.json {
        print_report_json(&report)?;
    } else {
        print_report(&report);
    }
    report.into_result().map(|_| ())
}

fn print_report(report: &PipelineReport) {
    let stats = &report.outcome.stats;
    println!("\n{}", "Summary".green().bold());
    println!("  {} {}", "├─ Written:".dimmed(), stats.written());
    println!("  {} {}", "├─ Blank:".dimmed(), stats.elided);
    println!("  {} {}", "├─ Failed:".dimmed(), stats.failed);
    println!(
        "  {} {:.2}s",
        "├─ Render time:".dimmed(),
        report.outcome.elapsed.as_secs_f64()
    );
    match &report.compression {
        Some(compression) => print_compression("└─", compression),
        None => println!("  {} skipped", "└─ WebP:".dimmed()),
    }
    println!("  {}", report.layout.base_dir().display());

    for failure in &report.outcome.failures {
        eprintln!("{} {}", "Failed".red(), failure);
    }
}

fn print_compression(branch: &str, compression: &CompressionReport) {
    println!(
        "  {} {:.2} MB -> {:.2} MB ({:.2}% of the original size)",
        format!("{} WebP:", branch).dimmed(),
        compression.source_mb(),
        compression.target_mb(),
        compression.ratio_percent()
    );
}

fn print_report_json(report: &PipelineReport) -> Result<()> {
    let failures: Vec<String> = report
        .outcome
        .failures
        .iter()
        .map(|f| f.to_string())
        .collect();
    let value = serde_json::json!({
        "output": report.layout.base_dir().display().to_string(),
        "levels": report.plan.levels(),
        "stats": report.outcome.stats,
        "failures": failures,
        "elapsed_ms": report.outcome.elapsed.as_millis() as u64,
        "compression": report.compression,
    });
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| Error::Other(format!("JSON serialization failed: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn cmd_plan(params: GeometryParams, json: bool) -> Result<()> {
    let plan = plan_from_params(&params)?;

    if json {
        let text = serde_json::to_string_pretty(&plan)
            .map_err(|e| Error::Other(format!("JSON serialization failed: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", "Pyramid Plan".cyan().bold());
    println!("{}", "─".repeat(58).dimmed());
    println!(
        "{:>5} {:>8} {:>8} {:>8} {:>14} {:>10}",
        "z".bold(),
        "columns".bold(),
        "rows".bold(),
        "tiles".bold(),
        "pixels".bold(),
        "scale".bold()
    );
    for level in plan.levels() {
        println!(
            "{:>5} {:>8} {:>8} {:>8} {:>14} {:>10}",
            level.z,
            level.columns,
            level.rows,
            level.tile_count(),
            format!("{}x{}", level.width_px, level.height_px),
            level.scale
        );
    }
    println!("{}", "─".repeat(58).dimmed());
    println!(
        "{}: {} tiles of {} px",
        "Total".bold(),
        plan.total_tiles(),
        plan.tile_resolution()
    );
    Ok(())
}

fn cmd_compress(dir: &Path) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Compressing {}", dir.display()));
    let result = compress_tiles(dir);
    spinner.finish_and_clear();

    let report = result?;
    println!(
        "{} {} tiles",
        "Converted".green().bold(),
        report.file_count
    );
    print_compression("└─", &report);
    Ok(())
}

fn cmd_units() {
    println!("{}", "Distance Units".cyan().bold());
    println!("{}", "─".repeat(32).dimmed());
    for unit in DistanceUnit::ALL {
        println!("{:<12} {} m", unit.name().bold(), unit.meters());
    }
}

fn cmd_version() {
    println!("{} {}", "pdfpyramid".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Tile pyramid generator for PDF drawings");
    println!();
    println!("License: MIT");
}
