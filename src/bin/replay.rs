/// Replay a recorded sensor log through one pose filter and dump the
/// per-event filter snapshots as JSON.
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use serde_json::json;

use pose_tracker_rs::sensors::{load_log, SensorEvent};
use pose_tracker_rs::{build_filter, BeaconMap, FilterConfig, FilterVariant};

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a sensor log through the LKF or EKF pose filter", long_about = None)]
struct Args {
    /// Path to sensor log (.json or .json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Filter config JSON; variant defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Filter variant (ignored when --config is given)
    #[arg(long, value_enum, default_value = "extended")]
    variant: Variant,

    /// Write snapshots here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Variant {
    Linear,
    Extended,
}

impl From<Variant> for FilterVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Linear => FilterVariant::Linear,
            Variant::Extended => FilterVariant::Extended,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FilterConfig::from_json_file(path)?,
        None => FilterConfig::for_variant(args.variant.into()),
    };
    let mut filter = build_filter(&config)?;

    let log = load_log(&args.log)?;
    let map = BeaconMap::new(log.beacons.iter().copied());
    info!(
        "replaying {} events against {} beacons",
        log.events.len(),
        map.len()
    );

    let mut last_predict: Option<f64> = None;
    let mut snapshots = Vec::with_capacity(log.events.len());
    for event in &log.events {
        match event {
            SensorEvent::Gyro(gyro) => {
                let dt = last_predict.map_or(0.0, |t| (gyro.timestamp - t).max(0.0));
                filter.predict(dt, Some(gyro));
                last_predict = Some(gyro.timestamp);
            }
            SensorEvent::Gps(gps) => filter.update_position(gps),
            SensorEvent::Lidar { measurements, .. } => {
                filter.update_range_bearing_batch(measurements, &map)
            }
        }
        snapshots.push(json!({
            "timestamp": event.timestamp(),
            "filter": filter.snapshot(),
        }));
    }

    let final_snapshot = filter.snapshot();
    info!(
        "done: {} predictions, {} gps, {} lidar applied, {} lidar skipped",
        final_snapshot.predict_count,
        final_snapshot.gps_updates,
        final_snapshot.lidar_updates,
        final_snapshot.lidar_skipped
    );

    let output = json!({
        "config": config,
        "snapshots": snapshots,
        "final": final_snapshot,
    });
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &output)?;
        }
        None => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}
