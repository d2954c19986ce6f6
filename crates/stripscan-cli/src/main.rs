//! stripscan CLI — command-line interface for test-strip analysis.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use stripscan::{
    nearest_two, Analyzer, CalibrationProfile, ChemistryReading, PadKey, ScanError, StripLayout,
    WhiteBalance,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "stripscan")]
#[command(about = "Read water-chemistry values from a photographed 7-pad test strip")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a cropped strip photo into a chemistry reading.
    Scan(CliScanArgs),

    /// Print the embedded strip layout and swatch tables.
    LayoutInfo,

    /// Classify one RGB color against a pad's swatch table.
    ClassifyTest {
        /// Pad key (hardness, free_cl, bromine, total_cl, cya, alk, ph).
        #[arg(long)]
        pad: String,

        /// Sampled color as R,G,B (e.g. 245,236,234).
        #[arg(long)]
        rgb: String,
    },

    /// Build a calibration profile from a known-neutral pixel.
    Calibrate(CliCalibrateArgs),
}

#[derive(Debug, Clone, Args)]
struct CliScanArgs {
    /// Path to the cropped strip image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the scan report (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Strip layout JSON (defaults to the embedded EasyTest 7-in-1 chart).
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Calibration profile JSON (white balance + offsets).
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Previous reading JSON used as the hysteresis anchor.
    #[arg(long)]
    previous: Option<PathBuf>,

    /// Path to write the diagnostic pad fingerprint (JSON).
    #[arg(long)]
    fingerprints: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliCalibrateArgs {
    /// Image containing a known-neutral white/gray area.
    #[arg(long)]
    image: PathBuf,

    /// Pixel column of the neutral sample.
    #[arg(long)]
    x: u32,

    /// Pixel row of the neutral sample.
    #[arg(long)]
    y: u32,

    /// Path to write the calibration profile (JSON).
    #[arg(long)]
    out: PathBuf,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => run_scan(&args),
        Commands::LayoutInfo => run_layout_info(),
        Commands::ClassifyTest { pad, rgb } => run_classify_test(&pad, &rgb),
        Commands::Calibrate(args) => run_calibrate(&args),
    }
}

// ── scan ───────────────────────────────────────────────────────────────

fn run_scan(args: &CliScanArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());

    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let layout = match &args.layout {
        Some(path) => StripLayout::from_json_file(path)?,
        None => StripLayout::default(),
    };

    let calibration = match &args.calibration {
        Some(path) => CalibrationProfile::from_json_file(path)?,
        None => CalibrationProfile::default(),
    };

    let mut analyzer = Analyzer::new(layout);

    if let Some(path) = &args.previous {
        let data = std::fs::read_to_string(path)?;
        let previous: ChemistryReading = serde_json::from_str(&data)?;
        analyzer.set_previous_reading(Some(previous));
    }

    let report = match analyzer.analyze(&rgba, &calibration) {
        Ok(report) => report,
        Err(err @ ScanError::InsufficientPads { .. }) => {
            return Err(err.to_string().into());
        }
    };

    let r = &report.reading;
    tracing::info!(
        "Reading: pH {} | FC {} ppm | TC {} ppm | Br {} ppm | hardness {} | alk {} | CYA {}",
        r.ph,
        r.free_cl,
        r.total_cl,
        r.bromine,
        r.hardness,
        r.alk,
        r.cya,
    );
    if r.chlorine_corrected {
        tracing::warn!("free/total chlorine pair was auto-corrected");
    }

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Report written to {}", args.out.display());

    if let Some(path) = &args.fingerprints {
        let json = serde_json::to_string_pretty(analyzer.fingerprints())?;
        std::fs::write(path, &json)?;
        tracing::info!("Fingerprints written to {}", path.display());
    }

    Ok(())
}

// ── layout-info ────────────────────────────────────────────────────────

fn run_layout_info() -> CliResult<()> {
    let layout = StripLayout::default();

    println!("stripscan embedded strip layout");
    println!("  name:  {}", layout.name);
    println!("  pads:  {}", layout.pads().len());

    for pad in layout.pads() {
        let range = match (pad.swatches.first(), pad.swatches.last()) {
            (Some(lo), Some(hi)) => format!("{} .. {}", lo.value, hi.value),
            _ => "no chart".to_string(),
        };
        println!(
            "  [{}] {:<16} {:<9} {} swatches, {}",
            pad.index,
            pad.label,
            pad.key.code(),
            pad.swatches.len(),
            range
        );
    }

    Ok(())
}

// ── classify-test ──────────────────────────────────────────────────────

fn run_classify_test(pad_str: &str, rgb_str: &str) -> CliResult<()> {
    let key: PadKey = pad_str.parse().map_err(|e: String| -> CliError { e.into() })?;
    let rgb = parse_rgb(rgb_str)?;

    let layout = StripLayout::default();
    let pad = layout
        .pad(key)
        .ok_or_else(|| -> CliError { format!("layout has no '{key}' pad").into() })?;

    let Some(pick) = nearest_two(rgb, &pad.swatches) else {
        return Err(format!("pad '{key}' has an empty swatch table").into());
    };

    println!("Input color:  ({}, {}, {})", rgb[0], rgb[1], rgb[2]);
    println!("Pad:          {} ({})", pad.label, key);
    println!("Best match:");
    println!("  value:      {}", pick.best_value);
    println!("  distance²:  {}", pick.best_dist);
    match pick.second_value {
        Some(second) => {
            println!("Second match:");
            println!("  value:      {}", second);
            println!("  distance²:  {}", pick.second_dist);
            println!(
                "  ratio:      {:.3}",
                pick.best_dist / pick.second_dist
            );
        }
        None => println!("Second match: none (single-point chart)"),
    }

    Ok(())
}

fn parse_rgb(s: &str) -> CliResult<[f64; 3]> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected R,G,B, got '{s}'").into());
    }
    let mut rgb = [0.0f64; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|e| -> CliError { format!("invalid channel '{part}': {e}").into() })?;
    }
    Ok(rgb)
}

// ── calibrate ──────────────────────────────────────────────────────────

fn run_calibrate(args: &CliCalibrateArgs) -> CliResult<()> {
    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();

    if args.x >= w || args.y >= h {
        return Err(format!(
            "sample pixel ({}, {}) outside image {}x{}",
            args.x, args.y, w, h
        )
        .into());
    }

    let p = rgba.get_pixel(args.x, args.y).0;
    let white_balance = WhiteBalance::from_neutral_sample(p[0], p[1], p[2]);
    tracing::info!(
        "Neutral sample ({}, {}) = ({}, {}, {}) -> factors r={:.4} g={:.4} b={:.4}",
        args.x,
        args.y,
        p[0],
        p[1],
        p[2],
        white_balance.r,
        white_balance.g,
        white_balance.b,
    );

    let profile = CalibrationProfile {
        white_balance,
        ..CalibrationProfile::default()
    };
    profile.to_json_file(&args.out)?;
    tracing::info!("Calibration written to {}", args.out.display());

    Ok(())
}
