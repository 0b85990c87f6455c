//! Shipping Mark CLI - Command line tool for generating shipping-mark labels.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use shipping_mark_core::{AddressMode, AppConfig, Color, GenerationJob, LabelGenerator};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, ValueEnum)]
enum ColorOption {
    Black,
    DarkRed,
    Blue,
}

impl From<ColorOption> for Color {
    fn from(opt: ColorOption) -> Self {
        match opt {
            ColorOption::Black => Self::black(),
            ColorOption::DarkRed => Self::dark_red(),
            ColorOption::Blue => Self::blue(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "shipping-mark")]
#[command(author, version, about = "Generate shipping-mark label PDFs", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true, env = "SHIPPING_MARK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the template PDFs
    #[arg(long, global = true, env = "SHIPPING_MARK_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,

    /// Directory holding image assets
    #[arg(long, global = true, env = "SHIPPING_MARK_ASSET_DIR")]
    asset_dir: Option<PathBuf>,

    /// Replacement profile table (TOML)
    #[arg(long, global = true, env = "SHIPPING_MARK_PROFILES")]
    profiles: Option<PathBuf>,

    /// Overlay text color
    #[arg(long, global = true, value_enum)]
    color: Option<ColorOption>,

    /// Overlay font size in points
    #[arg(long, global = true)]
    font_size: Option<f32>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the combined label document for a job file
    Generate {
        /// Job description (TOML)
        #[arg(short, long)]
        job: PathBuf,

        /// Output PDF file (default: the generated shipping_mark_* name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render the first page of a job's first batch
    Preview {
        /// Job description (TOML)
        #[arg(short, long)]
        job: PathBuf,

        /// Output PDF file
        #[arg(short, long, default_value = "preview.pdf")]
        output: PathBuf,
    },
    /// List the country profiles
    Profiles {
        /// Print the full table as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the selectable addresses
    Addresses,
    /// List the template PDFs
    Files,
}

impl Args {
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = if let Some(config_path) = &self.config {
            AppConfig::from_file(config_path).context("Failed to load config file")?
        } else {
            AppConfig::load()
        };

        if let Some(dir) = &self.template_dir {
            config.template_dir.clone_from(dir);
        }
        if let Some(dir) = &self.asset_dir {
            config.asset_dir.clone_from(dir);
        }
        if let Some(path) = &self.profiles {
            config.profiles_file = Some(path.clone());
        }
        if let Some(color) = self.color.clone() {
            config.text_color = color.into();
        }
        if let Some(size) = self.font_size {
            anyhow::ensure!(size > 0.0, "font size must be positive");
            config.font_size = size;
        }
        Ok(config)
    }
}

fn load_job(path: &Path) -> Result<GenerationJob> {
    GenerationJob::from_file(path).with_context(|| format!("Failed to load job {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).context(format!("Failed to write output: {}", path.display()))
}

fn generate(generator: &LabelGenerator, job_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let job = load_job(job_path)?;
    info!(
        "Job {}: profile {}, {} boxes, {} batches",
        job_path.display(),
        job.profile,
        job.total_boxes,
        job.batches.len()
    );

    // Setup progress bar
    let pb = ProgressBar::new(job.batches.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches")
            .unwrap()
            .progress_chars("#>-"),
    );

    let progress = pb.clone();
    let document = generator
        .generate_with_progress(
            &job,
            Some(Box::new(move |done, _total| {
                progress.set_position(done as u64);
            })),
        )
        .context("Failed to generate labels")?;

    pb.finish_and_clear();

    let output_path = output.unwrap_or_else(|| PathBuf::from(&document.file_name));
    write_output(&output_path, &document.pdf_bytes)?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "{} labels saved to: {}",
            document.page_count,
            output_path.display()
        );
    }
    Ok(())
}

fn preview(generator: &LabelGenerator, job_path: &Path, output: &Path) -> Result<()> {
    let job = load_job(job_path)?;
    let document = generator.preview(&job).context("Failed to render preview")?;
    write_output(output, &document.pdf_bytes)?;

    #[allow(clippy::print_stdout)]
    {
        println!("Preview saved to: {}", output.display());
    }
    Ok(())
}

// CLI output is intentional
#[allow(clippy::print_stdout)]
fn list_profiles(generator: &LabelGenerator, json: bool) -> Result<()> {
    let profiles = generator.profiles();
    if json {
        let table = serde_json::to_string_pretty(profiles.profiles())
            .context("Failed to serialize profiles")?;
        println!("{table}");
        return Ok(());
    }

    for (key, profile) in profiles.iter() {
        let mode = match profile.address_mode {
            AddressMode::Selectable => "selectable address",
            AddressMode::Fixed => "fixed address",
        };
        let extras: Vec<String> = profile.extra_fields.iter().map(ToString::to_string).collect();
        println!("{key:<12} {:<20} {mode:<18} {}", profile.name, extras.join(", "));
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn list_addresses(generator: &LabelGenerator) {
    for address in generator.profiles().addresses() {
        println!("{:<42} {}", address.label, address.value);
    }
}

#[allow(clippy::print_stdout)]
fn list_files(generator: &LabelGenerator) -> Result<()> {
    let files = generator.templates().context("Failed to list templates")?;
    if files.is_empty() {
        println!(
            "No templates in {}",
            generator.config().template_dir.display()
        );
    }
    for file in files {
        println!("{file}");
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.app_config()?;
    let generator = LabelGenerator::new(config).context("Failed to load the profile table")?;

    match args.command {
        Command::Generate { job, output } => generate(&generator, &job, output),
        Command::Preview { job, output } => preview(&generator, &job, &output),
        Command::Profiles { json } => list_profiles(&generator, json),
        Command::Addresses => {
            list_addresses(&generator);
            Ok(())
        }
        Command::Files => list_files(&generator),
    }
}
