use bioformats::{AdapterBuilder, AdapterConfig, Converter, FormatAdapter, ImageType, JavaConverter, Volume};
use bioformats_common::utils::{ensure_output_dir, format_file_size, is_tiff_file};
use clap::{Args, Parser, Subcommand};
use cli::{ImportJob, JobEntry};
use color_eyre::eyre::{bail, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Import microscopy images through Bio-Formats", long_about = None)]
struct Cli {
    /// Adapter configuration file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the Bio-Formats jars and SimpleImageConverter
    #[arg(long, global = true, env = "BIOFORMATS_TOOL_DIR")]
    tool_dir: Option<PathBuf>,
    /// Java executable
    #[arg(long, global = true)]
    java: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
struct PlaneArgs {
    #[arg(long, default_value_t = 0)]
    channel: u32,
    #[arg(long, default_value_t = 0)]
    series: u32,
    #[arg(long, default_value_t = 0)]
    time: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file and print the adapter summary
    Info {
        input: PathBuf,
        #[command(flatten)]
        plane: PlaneArgs,
    },
    /// Import a file and write the volume as a multi-page TIFF
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        plane: PlaneArgs,
        /// Target image type (UC2, UC3, US2, US3, F2, F3)
        #[arg(long)]
        image_type: Option<String>,
        /// Also write the middle slice as a PNG preview
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Run every entry of a job file through one adapter
    Process {
        /// Path to the job file (.toml or .json)
        #[arg(short, long)]
        job: PathBuf,
    },
    /// Print the JSON schema of the job file
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Info { input, plane } => {
            let config = load_config(&cli)?;
            show_info(&config, input, *plane)?;
        }
        Commands::Convert {
            input,
            output,
            plane,
            image_type,
            preview,
        } => {
            let mut config = load_config(&cli)?;
            if let Some(image_type) = image_type {
                config.image_type = image_type.clone();
            }
            convert_file(&config, input, output, *plane, preview.as_deref())?;
        }
        Commands::Process { job } => {
            let config = load_config(&cli)?;
            process_job(&config, job)?;
        }
        Commands::Schema => {
            println!("{}", ImportJob::json_schema()?);
        }
    }

    Ok(())
}

/// Config file (or defaults) with command line overrides applied
fn load_config(cli: &Cli) -> Result<AdapterConfig> {
    let mut config = match &cli.config {
        Some(path) => AdapterConfig::from_file(path)
            .wrap_err_with(|| format!("Failed to load config {:?}", path))?,
        None => AdapterConfig::default(),
    };

    if let Some(tool_dir) = &cli.tool_dir {
        config.tool_dir = Some(tool_dir.clone());
    }
    if let Some(java) = &cli.java {
        config.java = Some(java.clone());
    }
    Ok(config)
}

fn open_adapter(
    config: &AdapterConfig,
    input: &Path,
    plane: PlaneArgs,
) -> Result<FormatAdapter<JavaConverter>> {
    let converter = config.converter()?;
    info!("Using {}", converter.description());

    let adapter = AdapterBuilder::new()
        .file_name(input)
        .channel(plane.channel)
        .series(plane.series)
        .time(plane.time)
        .image_type(config.resolve_image_type()?)
        .build(converter)
        .wrap_err_with(|| format!("Failed to import {:?}", input))?;
    Ok(adapter)
}

fn show_info(config: &AdapterConfig, input: &Path, plane: PlaneArgs) -> Result<()> {
    let adapter = open_adapter(config, input, plane)?;
    println!("{}", adapter.summary());
    Ok(())
}

fn convert_file(
    config: &AdapterConfig,
    input: &Path,
    output: &Path,
    plane: PlaneArgs,
    preview: Option<&Path>,
) -> Result<()> {
    if !is_tiff_file(output) {
        warn!("Output {:?} has no .tif extension; writing TIFF anyway", output);
    }

    let mut adapter = open_adapter(config, input, plane)?;
    let volume = adapter.update()?;
    write_volume(&volume, output)?;

    if let Some(preview) = preview {
        volume.save_preview(preview)?;
        info!("Preview written to {:?}", preview);
    }
    Ok(())
}

fn write_volume(volume: &Volume, output: &Path) -> Result<()> {
    volume.save_tiff(output)?;
    let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    info!(
        "Wrote {}x{}x{} {} volume, spacing {} -> {:?} ({})",
        volume.width(),
        volume.height(),
        volume.depth(),
        volume.image_type(),
        volume.spacing(),
        output,
        format_file_size(size)
    );
    Ok(())
}

fn process_job(config: &AdapterConfig, job_path: &Path) -> Result<()> {
    let job = ImportJob::from_file(job_path)?;
    info!("Import job: {} entries", job.entries.len());

    let image_type = match &job.image_type {
        Some(name) => ImageType::parse(name)?,
        None => config.resolve_image_type()?,
    };

    ensure_output_dir(&job.output_dir)?;

    let mut adapter = AdapterBuilder::new()
        .image_type(image_type)
        .build(config.converter()?)?;

    let mut failed = 0usize;
    for entry in &job.entries {
        let output = job.output_path(entry);
        info!("Processing '{}' -> {:?}", entry.name, output);

        match import_entry(&mut adapter, entry) {
            Ok(volume) => {
                write_volume(&volume, &output)?;
                info!("{}", adapter.summary());
            }
            Err(err) => {
                error!("Failed to import '{}': {}", entry.name, err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} entries failed", failed, job.entries.len());
    }

    info!("✅ Import job completed!");
    Ok(())
}

fn import_entry(
    adapter: &mut FormatAdapter<JavaConverter>,
    entry: &JobEntry,
) -> bioformats::Result<Volume> {
    // Unset the source first so only set_file_name runs the converter
    adapter.clear_file_name()?;
    adapter.set_channel(entry.channel)?;
    adapter.set_series(entry.series)?;
    adapter.set_time(entry.time)?;
    adapter.set_file_name(&entry.path)?;
    adapter.update()
}
