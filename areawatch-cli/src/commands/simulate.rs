//! Simulate command - a synthetic fleet crossing a watched harbour.
//!
//! Vessels sail straight lines through the watch area on evenly spread
//! bearings. Each step reports every vessel's position to the tracker while
//! the reconciliation loop runs on its own interval; entered/exited events
//! are printed as they arrive.

use std::sync::Arc;
use std::time::Duration;

use areawatch::geometry::{Circle, Position, PositionTime, EARTH_RADIUS_METERS};
use areawatch::scheduler::spawn_reconciliation;
use areawatch::subscription::{AreaEvent, ChannelHandler};
use areawatch::PositionTracker;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Copenhagen harbour.
const HARBOUR_LAT: f64 = 55.6761;
const HARBOUR_LON: f64 = 12.5683;

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub vessels: usize,
    pub steps: u64,
    pub interval_ms: Option<u64>,
    pub radius: f64,
    pub slack: Option<f64>,
    pub json: bool,
}

/// A vessel on a straight course through the harbour centre.
#[derive(Debug, Clone)]
struct Vessel {
    name: String,
    /// Course in radians, clockwise from north.
    bearing: f64,
    /// Signed distance from the centre at step 0, in metres.
    start_offset: f64,
    /// Metres covered per step.
    speed: f64,
}

impl Vessel {
    fn position_at(&self, step: u64) -> Result<Position, CliError> {
        let along = self.start_offset + self.speed * step as f64;
        let north = along * self.bearing.cos();
        let east = along * self.bearing.sin();

        let lat = HARBOUR_LAT + (north / EARTH_RADIUS_METERS).to_degrees();
        let lon = HARBOUR_LON
            + (east / (EARTH_RADIUS_METERS * HARBOUR_LAT.to_radians().cos())).to_degrees();
        Ok(Position::new(lat, lon)?)
    }
}

/// Build a deterministic fleet that enters and leaves a circle of `radius`
/// metres within `steps` steps.
fn build_fleet(count: usize, radius: f64, steps: u64) -> Vec<Vessel> {
    let steps = steps.max(1) as f64;
    (0..count)
        .map(|i| {
            let fraction = i as f64 / count.max(1) as f64;
            // Start between 1.5 and 2.5 radii out so arrivals are staggered
            let start = radius * (1.5 + fraction);
            Vessel {
                name: format!("vessel-{:03}", i + 1),
                bearing: fraction * std::f64::consts::TAU,
                start_offset: -start,
                speed: (2.0 * start) / steps,
            }
        })
        .collect()
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("simulate");

    let file_config = runner.config();
    let mut config = file_config.to_tracker_config();
    if let Some(ms) = args.interval_ms {
        config = config.with_tick_interval(Duration::from_millis(ms.max(1)));
    }
    let slack = args.slack.unwrap_or(config.default_slack);
    let interval = config.tick_interval;

    let center = Position::new(HARBOUR_LAT, HARBOUR_LON)?;
    let area = Circle::geodesic(center, args.radius)?;
    let fleet = build_fleet(args.vessels, args.radius, args.steps);

    let tracker: Arc<PositionTracker<String>> = Arc::new(PositionTracker::new(config)?);
    let (handler, events) = ChannelHandler::new();
    let handle = tracker.subscribe_with_slack(Arc::new(area), Arc::new(handler), slack)?;

    if !args.json {
        println!("AreaWatch Simulation");
        println!("====================");
        println!();
        println!("Watch area: {} m around {}", args.radius, center);
        println!("Slack:      {} m", slack);
        println!("Fleet:      {} vessels, {} steps", fleet.len(), args.steps);
        println!("Interval:   {:?}", interval);
        println!();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let cancellation = CancellationToken::new();
    let ctrlc_token = cancellation.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping simulation");
        ctrlc_token.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set Ctrl+C handler: {}", e)))?;

    let ticks = runtime.block_on(async {
        let reconciliation = spawn_reconciliation(
            Arc::clone(&tracker),
            interval,
            cancellation.clone(),
        );
        let printer = tokio::spawn(print_events(events, args.json, cancellation.clone()));

        produce(&tracker, &fleet, args.steps, interval, &cancellation).await?;

        // One more interval so the last step is reconciled
        tokio::time::sleep(interval * 2).await;
        cancellation.cancel();

        let ticks = reconciliation
            .await
            .map_err(|e| CliError::Runtime(e.to_string()))?;
        printer
            .await
            .map_err(|e| CliError::Runtime(e.to_string()))??;
        Ok::<u64, CliError>(ticks)
    })?;

    let stats = tracker.stats();
    info!(ticks, members = handle.subscription().member_count(), "Simulation finished");

    if args.json {
        eprintln!("{}", stats);
    } else {
        println!();
        println!("Inside at end: {}", handle.subscription().member_count());
        println!();
        println!("{}", stats);
    }

    Ok(())
}

/// Report every vessel's position once per interval.
async fn produce(
    tracker: &PositionTracker<String>,
    fleet: &[Vessel],
    steps: u64,
    interval: Duration,
    cancellation: &CancellationToken,
) -> Result<(), CliError> {
    let step_millis = interval.as_millis() as i64;
    for step in 0..=steps {
        if cancellation.is_cancelled() {
            break;
        }
        let time = step as i64 * step_millis;
        for vessel in fleet {
            let position = vessel.position_at(step)?;
            tracker.update(vessel.name.clone(), PositionTime::new(position, time));
        }
        debug!(step, vessels = fleet.len(), "Positions reported");
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

/// Print events until cancelled, then drain whatever is queued.
async fn print_events(
    mut events: UnboundedReceiver<AreaEvent<String>>,
    json: bool,
    cancellation: CancellationToken,
) -> Result<(), CliError> {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event, json)?,
                None => return Ok(()),
            },
            _ = cancellation.cancelled() => break,
        }
    }

    while let Ok(event) = events.try_recv() {
        print_event(&event, json)?;
    }
    Ok(())
}

fn print_event(event: &AreaEvent<String>, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!(
            "[t+{:>6} ms] {:<7} {} at {}",
            event.position.time(),
            event.transition.to_string(),
            event.target,
            event.position.position()
        );
    }
    Ok(())
}
