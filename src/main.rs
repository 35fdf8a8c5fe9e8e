//! segpaint command-line driver: inspect and export saved projects.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use segpaint::config::AppConfig;
use segpaint::format::formats::rasterize_outline;
use segpaint::format::{ExportOptions, ExportResult, FormatError, FormatRegistry, ProjectData};

#[derive(Parser)]
#[command(name = "segpaint", version, about = "Inspect and export segpaint projects")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a project to one or more formats.
    Export {
        /// Project bundle (.sgmt)
        project: PathBuf,
        /// COCO JSON output
        #[arg(long)]
        json: Option<PathBuf>,
        /// Shapefile output
        #[arg(long)]
        shp: Option<PathBuf>,
        /// Flattened image output
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Print a summary of a project.
    Info {
        /// Project bundle (.sgmt)
        project: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {:?}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.preferences.log_level.as_filter_str()),
    )
    .init();

    let outcome = match &cli.command {
        Commands::Export {
            project,
            json,
            shp,
            png,
        } => export(&config, project, json.as_deref(), shp.as_deref(), png.as_deref()),
        Commands::Info { project } => info(project),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_project(registry: &FormatRegistry, path: &Path) -> Result<ProjectData, FormatError> {
    registry.native().import(path, &Default::default())
}

fn export(
    config: &AppConfig,
    project: &Path,
    json: Option<&Path>,
    shp: Option<&Path>,
    png: Option<&Path>,
) -> Result<(), FormatError> {
    let registry = FormatRegistry::new();
    let mut data = load_project(&registry, project)?;

    let options = ExportOptions::new()
        .category_name(config.coco.category_name.clone())
        .description(config.coco.description.clone())
        .georef(data.georef());

    let targets = [("coco", json), ("shp", shp), ("png", png)];
    if targets.iter().all(|(_, path)| path.is_none()) {
        log::warn!("Nothing to export: pass --json, --shp or --png");
        return Ok(());
    }

    if json.is_some() {
        // Bundles store outlines only; COCO needs bitmaps.
        let (width, height) = data.dimensions.unwrap_or((0, 0));
        for record in data.records.iter_mut().filter(|r| r.mask.is_none()) {
            record.mask = Some(rasterize_outline(&record.points, width, height));
        }
    }

    for (id, path) in targets {
        let Some(path) = path else {
            continue;
        };
        let format = registry
            .get(id)
            .ok_or_else(|| FormatError::UnsupportedOperation(format!("no '{id}' format")))?;
        let result = format.export(&data, path, &options)?;
        report(format.display_name(), &result);
    }
    Ok(())
}

fn report(format: &str, result: &ExportResult) {
    println!(
        "{}: {} annotations -> {}",
        format,
        result.annotations_exported,
        result
            .files_created
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for warning in &result.warnings {
        println!("  {:?}: {}", warning.severity, warning.message);
    }
}

fn info(project: &Path) -> Result<(), FormatError> {
    let registry = FormatRegistry::new();
    let data = load_project(&registry, project)?;

    println!("Project:  {}", project.display());
    println!("Version:  {}", data.version);
    println!("Image:    {}", data.image_file_name());
    if let Some((width, height)) = data.dimensions {
        println!("Size:     {}x{}", width, height);
    }
    if let Some(created) = &data.metadata.created {
        println!("Created:  {}", created);
    }
    println!("Masks:    {}", data.records.len());
    for record in &data.records {
        println!(
            "  {:<10} {:<16} group={:<12} vertices={}",
            record.name,
            record.display_name,
            record.group_id,
            record.points.len()
        );
    }
    Ok(())
}
