use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use layertrace::geom::geodetic::ecef_to_geodetic;
use layertrace::sim::{
    ContinuousLossEngine, EngineConfig, ErrorKind, EventMask, LayerStack, LayeredWorld,
    MaterialDatabase, MaterialLibrary, Observation, Observer, ParticleState, TransportConfig,
    TransportError, TransportLoop, TransportStatus, Wgs84Frame,
};

/// Reference location of the particle source.
const LATITUDE: f64 = 45.0;
const LONGITUDE: f64 = 3.0;
const ALTITUDE: f64 = -0.5;

/// Layer bottoms (m), 1 km apart, topped by void at 2 km.
const ELEVATIONS: [f64; 3] = [-1000.0, 0.0, 1000.0];
const CEILING: f64 = 2000.0;
const MATERIALS: [&str; 3] = ["StandardRock", "Water", "Air"];

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Transport a particle through a flat Earth made of rock, water and air",
    allow_negative_numbers = true
)]
struct Args {
    /// Azimuth of the direction, clockwise from North (deg)
    azimuth: f64,
    /// Elevation of the direction above the horizon (deg)
    elevation: f64,
    /// Initial kinetic energy (GeV)
    kinetic_energy: f64,
    /// Seed of the pseudo-random generator
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Number of trajectories; more than one prints a summary only
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// Maximum number of transport steps per trajectory
    #[arg(long, default_value_t = 10_000)]
    max_iterations: usize,
    /// Relative half-width of the energy-loss fluctuation
    #[arg(long, default_value_t = 0.0)]
    straggling: f64,
    /// Stop after this path length (m)
    #[arg(long)]
    distance_limit: Option<f64>,
    /// Print one JSON object per line instead of text
    #[arg(long)]
    json: bool,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Nothing left to report to if stderr is gone
            let _ = report(&err, &mut io::stderr().lock());
            exit_code(&err)
        }
    }
}

/// Writes a fatal error as a single line.
fn report(err: &anyhow::Error, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "error: {err:#}")
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    ExitCode::from(exit_status(err))
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TransportError>().map(TransportError::kind) {
        Some(ErrorKind::Configuration) => 3,
        Some(ErrorKind::Engine) => 4,
        None => 1,
    }
}

fn transport_config(args: &Args) -> TransportConfig {
    let mut config = TransportConfig::new();
    config.max_iterations = args.max_iterations;
    config.seed = args.seed;
    config
}

fn run(args: &Args) -> Result<()> {
    let library = MaterialLibrary::with_presets();
    let stack = LayerStack::new(ELEVATIONS.to_vec())?.with_ceiling(CEILING)?;
    let world = LayeredWorld::build(stack, Wgs84Frame::new(), &MATERIALS, &library)
        .context("building the layered world")?;

    let stepper = world.stepper();
    let position = stepper.position(LATITUDE, LONGITUDE, ALTITUDE);
    let direction = stepper.direction(LATITUDE, LONGITUDE, args.azimuth, args.elevation);
    let state = ParticleState::new(position, direction, args.kinetic_energy)
        .context("initial particle state")?;

    let mut engine_config = EngineConfig::new();
    engine_config.straggling = args.straggling;
    if let Some(limit) = args.distance_limit {
        engine_config.events = engine_config.events | EventMask::LIMIT_DISTANCE;
        engine_config.distance_limit = Some(limit);
    }
    let engine = ContinuousLossEngine::new(&library, engine_config);

    let transport = TransportLoop::new(transport_config(args));
    let resolver = world.resolver();

    if args.count > 1 {
        let states = vec![state; args.count];
        let outcomes = transport.run_batch(&engine, &resolver, states);
        return summarize(outcomes, args.json);
    }

    let mut rng = StdRng::seed_from_u64(transport.config().seed);
    let mut printer = Printer::new(io::stdout().lock(), &library, args.json);
    let outcome = transport.run(&engine, &resolver, state, &mut rng, &mut printer)?;
    printer.finish().context("writing observations")?;
    info!(status = ?outcome.status, iterations = outcome.iterations, "done");
    Ok(())
}

#[derive(Serialize)]
struct ObservationRecord<'a> {
    index: usize,
    energy: f64,
    altitude: f64,
    distance: f64,
    material: &'a str,
}

/// Writes every observation to `out`, keeping the first write error.
struct Printer<'a, W: Write> {
    out: W,
    library: &'a MaterialLibrary,
    json: bool,
    error: Option<io::Error>,
}

impl<'a, W: Write> Printer<'a, W> {
    fn new(out: W, library: &'a MaterialLibrary, json: bool) -> Self {
        Self {
            out,
            library,
            json,
            error: None,
        }
    }

    fn write(&mut self, obs: &Observation<'_>) -> io::Result<()> {
        let altitude = ecef_to_geodetic(obs.state.position).altitude;
        let material = match obs.medium {
            None => "(void)",
            Some(m) => self.library.material_name(m.material).unwrap_or("(unknown)"),
        };
        if self.json {
            let record = ObservationRecord {
                index: obs.index,
                energy: obs.state.energy,
                altitude,
                distance: obs.state.distance,
                material,
            };
            serde_json::to_writer(&mut self.out, &record)?;
            writeln!(self.out)
        } else {
            writeln!(
                self.out,
                "{:2}. energy = {:.3E}, altitude = {:8.2}, material = {}",
                obs.index, obs.state.energy, altitude, material
            )
        }
    }

    fn finish(mut self) -> io::Result<()> {
        match self.error.take() {
            Some(err) => Err(err),
            None => self.out.flush(),
        }
    }
}

impl<W: Write> Observer for Printer<'_, W> {
    fn observe(&mut self, observation: &Observation<'_>) {
        if self.error.is_none()
            && let Err(err) = self.write(observation)
        {
            self.error = Some(err);
        }
    }
}

fn summarize(
    outcomes: Vec<layertrace::sim::error::Result<layertrace::sim::TransportOutcome>>,
    json: bool,
) -> Result<()> {
    let total = outcomes.len();
    let mut exited = 0;
    let mut stopped = 0;
    let mut other = 0;
    let mut distance = 0.0;
    let mut first_error = None;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(outcome) => {
                match outcome.status {
                    TransportStatus::StoppedVoid => exited += 1,
                    TransportStatus::StoppedEnergy => stopped += 1,
                    _ => other += 1,
                }
                distance += outcome.state.distance;
                if json {
                    serde_json::to_writer(&mut out, &outcome)?;
                    writeln!(out)?;
                }
            }
            Err(err) => {
                warn!(trajectory = i, "{err}");
                first_error.get_or_insert(err);
            }
        }
    }

    let done = exited + stopped + other;
    if !json {
        writeln!(out, "trajectories = {total}")?;
        writeln!(out, "exited       = {exited}")?;
        writeln!(out, "stopped      = {stopped}")?;
        writeln!(out, "other        = {other}")?;
        if done > 0 {
            writeln!(out, "mean path    = {:.2} m", distance / done as f64)?;
        }
    }
    out.flush()?;

    match first_error {
        Some(err) => Err(err).context(format!("{} of {total} trajectories failed", total - done)),
        None => Ok(()),
    }
}
