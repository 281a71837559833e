//! Clearcut CLI - forest-loss detection from two multispectral epochs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use clearcut_algorithms::detection::DetectionMethod;
use clearcut_algorithms::imagery::{compute_indices, IndexParams};
use clearcut_core::io::write_geotiff;
use clearcut_core::{
    Band, ClusterLinking, DetectionConfig, DetectionResult, DetectionStatus, EpochRequest,
    GeoTiffDirectory, ImageEpoch, ImagerySource,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "clearcut")]
#[command(author, version, about = "Forest-loss change detection", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads (default: one per core)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect forest loss between two epochs and write GeoJSON
    Detect {
        /// Directory with the before epoch (blue.tif, red.tif, nir.tif, swir1.tif)
        #[arg(long)]
        before: PathBuf,
        /// Directory with the after epoch
        #[arg(long)]
        after: PathBuf,
        /// JSON configuration file (missing fields take defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Detection strategy: consensus or ndvi
        #[arg(short, long, default_value = "consensus")]
        method: DetectionMethod,
        /// Pixel linking rule for clustering
        #[arg(long, value_enum)]
        linking: Option<LinkingArg>,
        /// Ground area of one pixel in square metres
        #[arg(long)]
        pixel_area: Option<f64>,
        /// Minimum cluster size in pixels
        #[arg(long)]
        min_cluster_pixels: Option<usize>,
        /// Multiplier from stored samples to reflectance (default: 1e-4 for
        /// integer bands, 1 for float bands)
        #[arg(long)]
        reflectance_scale: Option<f64>,
        /// Acquisition date of the before epoch (ISO 8601)
        #[arg(long, default_value = "unknown")]
        before_date: String,
        /// Acquisition date of the after epoch (ISO 8601)
        #[arg(long, default_value = "unknown")]
        after_date: String,
        /// Output GeoJSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write NDVI, EVI and moisture rasters for one epoch
    Indices {
        /// Directory with the epoch bands
        #[arg(long)]
        epoch: PathBuf,
        /// Directory to write ndvi.tif, evi.tif and moisture.tif into
        #[arg(long)]
        output_dir: PathBuf,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Multiplier from stored samples to reflectance
        #[arg(long)]
        reflectance_scale: Option<f64>,
    },
    /// Print the default configuration as JSON
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkingArg {
    /// Raster 8-adjacency
    Raster,
    /// Distance-bounded linking through a k-d tree
    Distance,
}

impl From<LinkingArg> for ClusterLinking {
    fn from(arg: LinkingArg) -> Self {
        match arg {
            LinkingArg::Raster => ClusterLinking::RasterAdjacency,
            LinkingArg::Distance => ClusterLinking::DistanceBounded,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn setup_threads(threads: Option<usize>) -> Result<()> {
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("Failed to configure thread pool")?;
    }
    Ok(())
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<DetectionConfig> {
    let Some(path) = path else {
        return Ok(DetectionConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: DetectionConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

fn read_epoch(dir: &Path, name: &str, date: &str, scale: Option<f64>) -> Result<ImageEpoch> {
    let pb = spinner(&format!("Reading {} epoch...", name));
    let mut request = EpochRequest::new(name, date, date);
    if let Some(scale) = scale {
        request = request.with_reflectance_scale(scale);
    }
    let epoch = GeoTiffDirectory::new(dir)
        .fetch(&request)
        .with_context(|| format!("Failed to read {} epoch from {}", name, dir.display()))?;
    pb.finish_and_clear();
    info!("{}: {} x {} ({} bands)", name, epoch.cols(), epoch.rows(), epoch.bands().count());
    Ok(epoch)
}

/// GeoJSON FeatureCollection for a result
fn to_geojson(result: &DetectionResult, method: &DetectionMethod, alert_confidence: f64) -> Value {
    let features: Vec<Value> = result
        .features
        .iter()
        .map(|f| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [f.ring()],
                },
                "properties": {
                    "area_ha": f.area_ha,
                    "confidence": f.confidence,
                    "pixel_count": f.pixel_count,
                    "severity": f.severity,
                    "alert": f.is_alert(alert_confidence),
                    "mean_ndvi_loss": f.mean_ndvi_loss,
                    "mean_evi_loss": f.mean_evi_loss,
                    "mean_moisture_gain": f.mean_moisture_gain,
                    "full_agreement_fraction": f.full_agreement_fraction,
                    "compactness": f.compactness,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
        "method": method.name(),
        "status": result.status(),
        "flags": result.flags,
        "total_area_ha": result.total_area_ha,
        "feature_count": result.feature_count,
        "alert_count": result.alerts(alert_confidence).count(),
        "changed_pixels": result.changed_pixels,
        "diagnostics": result.diagnostics,
    })
}

fn write_output(value: &Value, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize GeoJSON")?;
    match output {
        Some(path) => {
            let pb = spinner("Writing output...");
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            pb.finish_and_clear();
            println!("GeoJSON saved to: {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    setup_threads(cli.threads)?;

    match cli.command {
        Commands::Detect {
            before,
            after,
            config,
            method,
            linking,
            pixel_area,
            min_cluster_pixels,
            reflectance_scale,
            before_date,
            after_date,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(linking) = linking {
                config.linking = linking.into();
            }
            if let Some(area) = pixel_area {
                config.pixel_area_m2 = area;
            }
            if let Some(min) = min_cluster_pixels {
                config.min_cluster_pixels = min;
            }
            config.validate().context("Invalid configuration")?;

            let before = read_epoch(&before, "before", &before_date, reflectance_scale)?;
            let after = read_epoch(&after, "after", &after_date, reflectance_scale)?;

            let start = Instant::now();
            let result = method
                .detect(&before, &after, &config)
                .context("Detection failed")?;
            let elapsed = start.elapsed();

            match result.status() {
                DetectionStatus::Inconclusive => {
                    warn!("Inconclusive: not enough spectral signal to separate change from noise")
                }
                status => info!(
                    "{:?}: {} features, {:.2} ha, {} alerts",
                    status,
                    result.feature_count,
                    result.total_area_ha,
                    result.alerts(config.alert_confidence).count()
                ),
            }
            info!("Processing time: {:.2?}", elapsed);

            let geojson = to_geojson(&result, &method, config.alert_confidence);
            write_output(&geojson, output.as_deref())?;
        }

        Commands::Indices {
            epoch,
            output_dir,
            config,
            reflectance_scale,
        } => {
            let config = load_config(config.as_deref())?;
            config.validate().context("Invalid configuration")?;
            let epoch = read_epoch(&epoch, "epoch", "unknown", reflectance_scale)?;

            let start = Instant::now();
            let indices =
                compute_indices(&epoch, &IndexParams::from(&config)).context("Index computation failed")?;
            info!("Processing time: {:.2?}", start.elapsed());

            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;
            let pb = spinner("Writing output...");
            for (name, raster) in [
                ("ndvi", &indices.ndvi),
                ("evi", &indices.evi),
                ("moisture", &indices.moisture),
            ] {
                let path = output_dir.join(format!("{}.tif", name));
                write_geotiff(raster, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            pb.finish_and_clear();
            println!("Indices saved to: {}", output_dir.display());
        }

        Commands::Config => {
            let text = serde_json::to_string_pretty(&DetectionConfig::default())
                .context("Failed to serialize configuration")?;
            println!("{}", text);
            eprintln!(
                "Required bands per epoch directory: {}",
                Band::REQUIRED
                    .iter()
                    .map(|b| format!("{}.tif", b.name()))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    Ok(())
}
