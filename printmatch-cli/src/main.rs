use clap::Parser;
use image::{Rgb, RgbImage};
use printmatch::{
    sequential_ids, DirectoryLoader, ExtractorConfig, ImageLoader, IndexConfig, MatchConfig,
    MatchSink, MatchView, PrintMatchError, PrintMatchResult, RankConfig, RankReport, Ranker,
    SingleNeighborPolicy, Symmetry,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "PrintMatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output (per-candidate scores, timings).
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SingleNeighborConfig {
    Reject,
    Accept,
    AcceptBelow(f32),
}

impl From<SingleNeighborConfig> for SingleNeighborPolicy {
    fn from(value: SingleNeighborConfig) -> Self {
        match value {
            SingleNeighborConfig::Reject => SingleNeighborPolicy::Reject,
            SingleNeighborConfig::Accept => SingleNeighborPolicy::Accept,
            SingleNeighborConfig::AcceptBelow(max) => SingleNeighborPolicy::AcceptBelow(max),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SymmetryConfig {
    Directional,
    Average,
    Max,
}

impl From<SymmetryConfig> for Symmetry {
    fn from(value: SymmetryConfig) -> Self {
        match value {
            SymmetryConfig::Directional => Symmetry::Directional,
            SymmetryConfig::Average => Symmetry::Average,
            SymmetryConfig::Max => Symmetry::Max,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExtractorConfigJson {
    contrast_threshold: f32,
    edge_threshold: f32,
    octave_layers: usize,
    sigma: f32,
    upsample: bool,
    max_features: Option<usize>,
}

impl Default for ExtractorConfigJson {
    fn default() -> Self {
        let cfg = ExtractorConfig::default();
        Self {
            contrast_threshold: cfg.contrast_threshold,
            edge_threshold: cfg.edge_threshold,
            octave_layers: cfg.octave_layers,
            sigma: cfg.sigma,
            upsample: cfg.upsample,
            max_features: cfg.max_features,
        }
    }
}

impl From<ExtractorConfigJson> for ExtractorConfig {
    fn from(value: ExtractorConfigJson) -> Self {
        Self {
            contrast_threshold: value.contrast_threshold,
            edge_threshold: value.edge_threshold,
            octave_layers: value.octave_layers,
            sigma: value.sigma,
            upsample: value.upsample,
            max_features: value.max_features,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    ratio: f32,
    trees: usize,
    checks: usize,
    seed: u64,
    single_neighbor: SingleNeighborConfig,
    symmetry: SymmetryConfig,
    exact: bool,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            ratio: cfg.ratio,
            trees: cfg.index.trees,
            checks: cfg.index.checks,
            seed: cfg.index.seed,
            single_neighbor: SingleNeighborConfig::Reject,
            symmetry: SymmetryConfig::Directional,
            exact: cfg.exact,
        }
    }
}

impl From<MatchConfigJson> for MatchConfig {
    fn from(value: MatchConfigJson) -> Self {
        Self {
            ratio: value.ratio,
            index: IndexConfig {
                trees: value.trees,
                checks: value.checks,
                seed: value.seed,
                ..IndexConfig::default()
            },
            single_neighbor: value.single_neighbor.into(),
            symmetry: value.symmetry.into(),
            exact: value.exact,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    probe: String,
    probe_dir: String,
    database_dir: String,
    candidates: Vec<String>,
    candidate_prefix: String,
    database_size: usize,
    threshold: f64,
    parallel: bool,
    visualize_dir: Option<String>,
    output_path: Option<String>,
    extractor: ExtractorConfigJson,
    matching: MatchConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: String::new(),
            probe_dir: ".".to_string(),
            database_dir: "database".to_string(),
            candidates: Vec::new(),
            candidate_prefix: "Suspect".to_string(),
            database_size: 10,
            threshold: RankConfig::default().similarity_threshold,
            parallel: false,
            visualize_dir: None,
            output_path: None,
            extractor: ExtractorConfigJson::default(),
            matching: MatchConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScoreRecord {
    id: String,
    score: f64,
    good_matches: usize,
}

#[derive(Debug, Serialize)]
struct SkipRecord {
    id: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct Output {
    probe: String,
    threshold: f64,
    probe_keypoints: usize,
    accepted: Vec<ScoreRecord>,
    rejected: Vec<ScoreRecord>,
    skipped: Vec<SkipRecord>,
}

impl Output {
    fn new(probe: &str, threshold: f64, report: &RankReport) -> Self {
        let scores = |items: &[printmatch::RankedResult]| -> Vec<ScoreRecord> {
            items
                .iter()
                .map(|r| ScoreRecord {
                    id: r.id.clone(),
                    score: r.score,
                    good_matches: r.good_matches,
                })
                .collect()
        };
        Self {
            probe: probe.to_string(),
            threshold,
            probe_keypoints: report.probe_keypoints,
            accepted: scores(&report.accepted),
            rejected: scores(&report.rejected),
            skipped: report
                .skipped
                .iter()
                .map(|s| SkipRecord {
                    id: s.id.clone(),
                    reason: s.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Resolves the probe from its own directory and candidates from the
/// database directory.
struct SplitLoader {
    probe_id: String,
    probe: DirectoryLoader,
    database: DirectoryLoader,
}

impl ImageLoader for SplitLoader {
    fn load(&self, id: &str) -> PrintMatchResult<printmatch::OwnedImage> {
        if id == self.probe_id {
            self.probe.load(id)
        } else {
            self.database.load(id)
        }
    }
}

/// Writes side-by-side PNGs with a line per retained correspondence.
struct PngSink {
    dir: PathBuf,
}

const LINE_COLOR: Rgb<u8> = Rgb([0, 220, 60]);
const POINT_COLOR: Rgb<u8> = Rgb([230, 40, 40]);

impl MatchSink for PngSink {
    fn render(&self, view: &MatchView<'_>) -> PrintMatchResult<()> {
        let (pw, ph) = (view.probe_image.width(), view.probe_image.height());
        let (cw, ch) = (view.candidate_image.width(), view.candidate_image.height());
        let mut canvas = RgbImage::new((pw + cw) as u32, ph.max(ch) as u32);
        for (img, x0) in [(view.probe_image, 0usize), (view.candidate_image, pw)] {
            for y in 0..img.height() {
                let Some(row) = img.row(y) else { continue };
                for (x, &v) in row.iter().enumerate() {
                    canvas.put_pixel((x0 + x) as u32, y as u32, Rgb([v, v, v]));
                }
            }
        }

        let probe_kps = view.probe.keypoints();
        let cand_kps = view.candidate.keypoints();
        for c in view.correspondences {
            let (Some(a), Some(b)) = (probe_kps.get(c.query_idx), cand_kps.get(c.train_idx)) else {
                continue;
            };
            let bx = b.x + pw as f32;
            draw_line(&mut canvas, a.x, a.y, bx, b.y, LINE_COLOR);
            draw_cross(&mut canvas, a.x, a.y, POINT_COLOR);
            draw_cross(&mut canvas, bx, b.y, POINT_COLOR);
        }

        let name = format!(
            "{}_vs_{}.png",
            sanitize(view.probe_id),
            sanitize(view.candidate_id)
        );
        let path = self.dir.join(name);
        canvas.save(&path).map_err(|err| PrintMatchError::Encode {
            id: path.display().to_string(),
            reason: err.to_string(),
        })
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn put(canvas: &mut RgbImage, x: f32, y: f32, color: Rgb<u8>) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (x, y) = (x.round() as u32, y.round() as u32);
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}

fn draw_line(canvas: &mut RgbImage, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb<u8>) {
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        put(canvas, x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, color);
    }
}

fn draw_cross(canvas: &mut RgbImage, x: f32, y: f32, color: Rgb<u8>) {
    for d in -2..=2 {
        put(canvas, x + d as f32, y, color);
        put(canvas, x, y + d as f32, color);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("printmatch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.probe.is_empty() {
        return Err("probe must be set in the config".into());
    }

    let candidates = if config.candidates.is_empty() {
        sequential_ids(&config.candidate_prefix, config.database_size)
    } else {
        config.candidates.clone()
    };

    let rank_cfg = RankConfig {
        similarity_threshold: config.threshold,
        parallel: config.parallel,
        visualize: config.visualize_dir.is_some(),
        extractor: config.extractor.into(),
        matching: config.matching.into(),
    };
    let mut ranker = Ranker::new(rank_cfg)?;
    if let Some(dir) = &config.visualize_dir {
        fs::create_dir_all(dir)?;
        ranker = ranker.with_sink(Arc::new(PngSink {
            dir: PathBuf::from(dir),
        }));
    }

    let loader = SplitLoader {
        probe_id: config.probe.clone(),
        probe: DirectoryLoader::new(&config.probe_dir),
        database: DirectoryLoader::new(&config.database_dir),
    };
    let report = ranker.rank_against_collection(&config.probe, &candidates, &loader)?;

    if let Some(err) = &report.probe_error {
        eprintln!("cannot load probe {}: {err}", config.probe);
    }
    for skipped in &report.skipped {
        eprintln!("skipped {}: {}", skipped.id, skipped.error);
    }
    if report.probe_error.is_none() {
        if report.accepted.is_empty() {
            eprintln!("No match found above the similarity threshold.");
        } else {
            for result in &report.accepted {
                eprintln!("Match with {}: {:.2}%", result.id, result.score);
            }
        }
    }

    let output = Output::new(&config.probe, config.threshold, &report);
    let json = serde_json::to_string_pretty(&output)?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
