use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use adtkit::batch::{BatchJob, BatchRunner, DEFAULT_CONCURRENCY};
use adtkit::relocate::relocate_buffer;
use adtkit::{Config, GridCoord, RelocationRequest};

#[derive(Parser)]
#[command(name = "adtkit")]
#[command(about = "Inspect, validate and relocate terrain tiles")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a tile and print it as JSON
    Decode { path: PathBuf },
    /// Structural and conformance report for each file
    Validate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Move one tile to a new grid coordinate in place
    Relocate {
        path: PathBuf,
        /// Current coordinate as x,y; taken from the file name when omitted
        #[arg(long, value_parser = parse_coord)]
        from: Option<GridCoord>,
        /// Target coordinate as x,y
        #[arg(long, value_parser = parse_coord)]
        to: GridCoord,
        #[arg(long, default_value_t = 0.0)]
        vertical_offset: f64,
        /// Extra x,up,z bias for map objects
        #[arg(long, value_parser = parse_vec3)]
        map_object_offset: Option<[f64; 3]>,
        /// Plan and report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Shift many tiles by the same grid offset
    BatchRelocate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Grid shift as dx,dy
        #[arg(long, value_parser = parse_shift, allow_hyphen_values = true)]
        shift: (i64, i64),
        #[arg(long, default_value_t = 0.0)]
        vertical_offset: f64,
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        jobs: usize,
    },
}

fn parse_pair<T: std::str::FromStr>(s: &str) -> Result<(T, T), String> {
    let (a, b) = s.split_once(',').ok_or_else(|| format!("expected two comma-separated values, got {s:?}"))?;
    let parse = |v: &str| v.trim().parse::<T>().map_err(|_| format!("bad number {v:?}"));
    Ok((parse(a)?, parse(b)?))
}

fn parse_coord(s: &str) -> Result<GridCoord, String> {
    let (x, y) = parse_pair::<u32>(s)?;
    Ok(GridCoord::new(x, y))
}

fn parse_shift(s: &str) -> Result<(i64, i64), String> {
    parse_pair(s)
}

fn parse_vec3(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|_| format!("bad number {v:?}")))
        .collect::<Result<_, _>>()?;
    parts.try_into().map_err(|_| format!("expected x,y,z, got {s:?}"))
}

fn shifted(coord: GridCoord, (dx, dy): (i64, i64)) -> Option<GridCoord> {
    let x = u32::try_from(coord.x as i64 + dx).ok()?;
    let y = u32::try_from(coord.y as i64 + dy).ok()?;
    Some(GridCoord::new(x, y))
}

fn coord_from_name(path: &Path) -> Result<GridCoord, Box<dyn std::error::Error>> {
    GridCoord::from_file_name(path)
        .ok_or_else(|| format!("{}: no coordinate in file name, pass --from", path.display()).into())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Decode { path } => {
            print_json(&adtkit::decode(&path, &config)?)?;
        }
        Commands::Validate { paths } => {
            let mut failed = 0;
            for path in &paths {
                let report = adtkit::validate(path, &config)?;
                if !report.passes(config.misaligned_tolerance) {
                    failed += 1;
                }
                print_json(&report)?;
            }
            if failed > 0 {
                tracing::error!(failed, "validation failed");
                std::process::exit(1);
            }
        }
        Commands::Relocate { path, from, to, vertical_offset, map_object_offset, dry_run } => {
            let from = match from {
                Some(from) => from,
                None => coord_from_name(&path)?,
            };
            let request = RelocationRequest::new(from, to)
                .with_vertical_offset(vertical_offset)
                .with_map_object_offset(map_object_offset.unwrap_or_default());

            if dry_run {
                let mut data = std::fs::read(&path)?;
                print_json(&relocate_buffer(&mut data, &request, &config)?)?;
                return Ok(());
            }
            let result = adtkit::relocate(&path, &request, &config)?;
            print_json(&result)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::BatchRelocate { paths, shift, vertical_offset, jobs } => {
            let mut batch = Vec::with_capacity(paths.len());
            for path in paths {
                let from = coord_from_name(&path)?;
                let to = shifted(from, shift).ok_or_else(|| format!("{}: shift leaves the grid", path.display()))?;
                let request = RelocationRequest::new(from, to).with_vertical_offset(vertical_offset);
                batch.push(BatchJob::Relocate { path, request });
            }
            let report = BatchRunner::new(Arc::new(config)).with_concurrency(jobs).run(batch).await?;
            print_json(&report)?;
            if report.failed > 0 {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
