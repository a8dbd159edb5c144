//! DryGully CLI - off-river pumped-hydro reservoir screening

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use drygully_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use drygully_core::Raster;
use drygully_sites::report::{write_json, PrettySummary, ScreeningSummary};
use drygully_sites::{
    condition, export_pretty_set, separate_land, CandidateStore, Config, Ledger, NativeEngine, OverlapResolver,
    PourPoint, PourPointScreener, PrettySetBuilder, RasterVectorEngine, Resolution, ScreenRange, SeparationParams,
    Variant,
};

const RECORDS: &str = "records.csv";
const CANDIDATES: &str = "candidates.geojson";
const RETAINED: &str = "retained.geojson";
const SCREENING_REPORT: &str = "screening.json";
const PRETTY_REPORT: &str = "pretty.json";

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "drygully")]
#[command(author, version, about = "Off-river pumped-hydro reservoir screening", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Derive flow direction and slope rasters from a DEM
    Condition {
        /// Input DEM file
        dem: PathBuf,
        /// Output D8 flow direction file
        #[arg(long)]
        flow_dir: PathBuf,
        /// Output slope file (degrees)
        #[arg(long)]
        slope: PathBuf,
    },
    /// Screen pour points into candidate sites
    Screen {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        screen: ScreenArgs,
    },
    /// Remove the worse of every pair of overlapping candidates
    Resolve {
        /// Directory holding candidates.geojson
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Pour-point distance beyond which sites never conflict (degrees)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Build and export the presentation set of the retained candidates
    Pretty {
        /// Directory holding retained.geojson
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        pretty: PrettyArgs,
    },
    /// Screen, resolve and export in one go
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        screen: ScreenArgs,
        #[command(flatten)]
        pretty: PrettyArgs,
    },
    /// Keep the DEM cells suitable for upper or lower reservoirs
    Separate {
        /// Input DEM file
        dem: PathBuf,
        /// Output file
        output: PathBuf,
        /// Altitude difference between the reservoirs (m)
        #[arg(long, default_value = "300")]
        head: f64,
        /// Horizontal distance per metre of head
        #[arg(long, default_value = "15")]
        slope_ratio: f64,
        /// upper or lower
        #[arg(long, default_value = "upper")]
        variant: String,
        /// Cell size in metres (taken from the DEM by default)
        #[arg(long)]
        cell_size: Option<f64>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// DEM file
    #[arg(long)]
    dem: Option<PathBuf>,
    /// D8 flow direction file (derived from the DEM when absent)
    #[arg(long)]
    flow_dir: Option<PathBuf>,
    /// Slope file in degrees (derived from the DEM when absent)
    #[arg(long)]
    slope: Option<PathBuf>,
    /// Pour point CSV with id,lat,long columns
    #[arg(long)]
    points: Option<PathBuf>,
    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ScreenArgs {
    /// Dam crest height above the pour point (m)
    #[arg(long)]
    max_dam_height: Option<f64>,
    /// Smallest reservoir kept, in cells
    #[arg(long)]
    min_cells: Option<usize>,
    /// Horizontal run per unit of dam height
    #[arg(long)]
    dam_batter: Option<f64>,
    /// Pour point ids to screen, e.g. "4,8,15"
    #[arg(long)]
    range: Option<String>,
    /// Append to an existing ledger instead of starting a new one
    #[arg(long)]
    append: bool,
}

#[derive(Args)]
struct PrettyArgs {
    /// Dam footprint half width (m)
    #[arg(long)]
    dam_buffer: Option<f64>,
    /// Boundary smoothing tolerance (m)
    #[arg(long)]
    smooth: Option<f64>,
    /// Skip KML output
    #[arg(long)]
    no_kml: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set the default subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn read_dem(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...")?;
    let raster: Raster<f64> = read_geotiff(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn parse_range(s: &str) -> Result<ScreenRange> {
    if s.trim().eq_ignore_ascii_case("all") {
        return Ok(ScreenRange::All);
    }
    let ids = s
        .split(',')
        .map(|id| id.trim().parse::<u32>().with_context(|| format!("Invalid pour point id: {}", id)))
        .collect::<Result<Vec<_>>>()?;
    Ok(ScreenRange::Ids(ids))
}

fn parse_variant(s: &str) -> Result<Variant> {
    match s.to_lowercase().as_str() {
        "upper" | "up" => Ok(Variant::Upper),
        "lower" | "low" => Ok(Variant::Lower),
        _ => anyhow::bail!("Unknown variant: {}. Use upper or lower.", s),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p).with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(Config::default()),
    }
}

impl InputArgs {
    fn apply(self, config: &mut Config) {
        let inputs = &mut config.inputs;
        inputs.dem = self.dem.or(inputs.dem.take());
        inputs.flow_direction = self.flow_dir.or(inputs.flow_direction.take());
        inputs.slope = self.slope.or(inputs.slope.take());
        inputs.points = self.points.or(inputs.points.take());
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
    }
}

impl ScreenArgs {
    fn apply(&self, config: &mut Config) -> Result<()> {
        let screen = &mut config.screen;
        if let Some(h) = self.max_dam_height {
            screen.max_dam_height = h;
        }
        if let Some(n) = self.min_cells {
            screen.min_reservoir_cells = n;
        }
        if let Some(b) = self.dam_batter {
            screen.dam_batter = b;
        }
        if let Some(range) = &self.range {
            screen.range = parse_range(range)?;
        }
        Ok(())
    }
}

impl PrettyArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(d) = self.dam_buffer {
            config.pretty.dam_buffer_m = d;
        }
        if let Some(t) = self.smooth {
            config.pretty.smooth_tolerance_m = t;
        }
        if self.no_kml {
            config.pretty.kml = false;
        }
    }
}

fn vector_engine(config: &Config) -> Result<NativeEngine> {
    NativeEngine::vector_only(config.crs.source(), config.crs.projected()).context("Failed to set up projection")
}

// ─── Stages ─────────────────────────────────────────────────────────────

fn screen_stage(config: &Config, append: bool) -> Result<(NativeEngine, CandidateStore)> {
    let points_path = config
        .inputs
        .points
        .as_ref()
        .context("No pour points given (--points or [inputs] points)")?;
    let points = PourPoint::load_csv(points_path).context("Failed to read pour points")?;
    info!("Pour points: {}", points.len());

    let pb = spinner("Loading rasters...")?;
    let engine = NativeEngine::open(&config.inputs, &config.crs).context("Failed to open rasters")?;
    pb.finish_and_clear();

    let dir = &config.output_dir;
    std::fs::create_dir_all(dir).context("Failed to create output directory")?;
    let ledger_path = dir.join(RECORDS);
    let mut ledger = if append {
        Ledger::append(&ledger_path)
    } else {
        Ledger::create(&ledger_path)
    }
    .context("Failed to open ledger")?;

    let pb = spinner("Screening pour points...")?;
    let report = PourPointScreener::new(&engine, config.screen.clone()).screen_all(&points, Some(&mut ledger))?;
    pb.finish_and_clear();

    write_json(dir.join(SCREENING_REPORT), &ScreeningSummary::from(&report))?;
    println!(
        "Screened: {}, skipped: {}, failed: {}",
        report.screened(),
        report.skipped(),
        report.failed()
    );

    let store = CandidateStore::from_candidates(report.into_candidates())?;
    store.save(dir.join(CANDIDATES), engine.source_crs())?;
    Ok((engine, store))
}

fn resolve_stage<E: RasterVectorEngine>(engine: &E, config: &Config, store: CandidateStore) -> Result<Resolution> {
    let resolver = OverlapResolver::from(&config.overlap);
    let resolution = resolver.resolve(engine, store.into_vec());
    println!(
        "Retained: {}, removed: {}",
        resolution.retained.len(),
        resolution.removed.len()
    );

    let retained = CandidateStore::from_candidates(resolution.retained.iter().cloned())?;
    retained.save(config.output_dir.join(RETAINED), engine.source_crs())?;
    Ok(resolution)
}

fn pretty_stage<E: RasterVectorEngine>(engine: &E, config: &Config, resolution: &Resolution) -> Result<()> {
    let builder = PrettySetBuilder::new(config.pretty.clone());
    let pb = spinner("Building presentation set...")?;
    let report = builder.build(engine, &resolution.retained);
    pb.finish_and_clear();

    let written = export_pretty_set(
        &config.output_dir,
        &report.sites,
        engine.source_crs(),
        config.pretty.kml,
    )?;
    write_json(
        config.output_dir.join(PRETTY_REPORT),
        &PrettySummary::new(resolution, &report),
    )?;
    if report.failed() > 0 {
        warn!("{} sites could not be built, see {}", report.failed(), PRETTY_REPORT);
    }
    println!("Sites exported: {} ({} files)", report.built(), written.len());
    Ok(())
}

fn load_store(path: &Path) -> Result<CandidateStore> {
    CandidateStore::load(path).with_context(|| format!("Failed to read {}", path.display()))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster = read_dem(&input)?;
            let (rows, cols) = raster.shape();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!("Extent: {}", raster.extent());
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Condition { dem, flow_dir, slope } => {
            let raster = read_dem(&dem)?;
            let start = Instant::now();
            let pb = spinner("Conditioning DEM...")?;
            let (fdir, slope_deg) = condition(&raster)?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            let options = || GeoTiffOptions { crs: raster.crs().copied() };
            write_geotiff(&fdir, &flow_dir, Some(options())).context("Failed to write flow direction")?;
            write_geotiff(&slope_deg, &slope, Some(options())).context("Failed to write slope")?;
            done("Flow direction", &flow_dir, elapsed);
            done("Slope", &slope, elapsed);
        }

        Commands::Screen { inputs, screen } => {
            let mut config = load_config(cli.config.as_ref())?;
            inputs.apply(&mut config);
            screen.apply(&mut config)?;
            config.validate()?;

            let start = Instant::now();
            let (_, store) = screen_stage(&config, screen.append)?;
            done(
                &format!("{} candidates", store.len()),
                &config.output_dir.join(CANDIDATES),
                start.elapsed(),
            );
        }

        Commands::Resolve { output_dir, threshold } => {
            let mut config = load_config(cli.config.as_ref())?;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(t) = threshold {
                config.overlap.threshold_deg = t;
            }
            config.validate()?;

            let start = Instant::now();
            let engine = vector_engine(&config)?;
            let store = load_store(&config.output_dir.join(CANDIDATES))?;
            resolve_stage(&engine, &config, store)?;
            done("Retained set", &config.output_dir.join(RETAINED), start.elapsed());
        }

        Commands::Pretty { output_dir, pretty } => {
            let mut config = load_config(cli.config.as_ref())?;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            pretty.apply(&mut config);
            config.validate()?;

            let start = Instant::now();
            let engine = vector_engine(&config)?;
            let store = load_store(&config.output_dir.join(RETAINED))?;
            let resolution = Resolution {
                retained: store.into_vec(),
                removed: Vec::new(),
            };
            pretty_stage(&engine, &config, &resolution)?;
            done("Presentation set", &config.output_dir, start.elapsed());
        }

        Commands::Run { inputs, screen, pretty } => {
            let mut config = load_config(cli.config.as_ref())?;
            inputs.apply(&mut config);
            screen.apply(&mut config)?;
            pretty.apply(&mut config);
            config.validate()?;

            let start = Instant::now();
            let (engine, store) = screen_stage(&config, screen.append)?;
            let resolution = resolve_stage(&engine, &config, store)?;
            pretty_stage(&engine, &config, &resolution)?;
            done("Presentation set", &config.output_dir, start.elapsed());
        }

        Commands::Separate {
            dem,
            output,
            head,
            slope_ratio,
            variant,
            cell_size,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let params = SeparationParams {
                head,
                slope_ratio,
                variant: parse_variant(&variant)?,
                cell_size_m: cell_size,
            };
            let raster = read_dem(&dem)?;
            let extent = raster.extent();
            let crs = raster.crs().copied();
            let engine = NativeEngine::with_dem(raster, config.crs.source(), config.crs.projected())?;

            let start = Instant::now();
            let pb = spinner("Separating land...")?;
            let result = separate_land(&engine, &extent, &params)?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            write_geotiff(&result, &output, Some(GeoTiffOptions { crs })).context("Failed to write output")?;
            done("Separated DEM", &output, elapsed);
        }
    }

    Ok(())
}
