//! # ROVE Drive Demo
//!
//! Runs the execution core against simulated motors: loads a TOML drive
//! configuration, spawns one closed-loop motor per entry, and drives the
//! scheduler at the configured control period while a promise-sequenced
//! routine exercises the velocity loop.

use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use rove_common::config::{DriveConfig, load_config};
use rove_core::{Promise, Scheduler};
use rove_drive::{Motor, SimPlant, SimulatedMotor};

/// ROVE Drive — cooperative control loop demo over simulated motors
#[derive(Parser, Debug)]
#[command(name = "rove_drive")]
#[command(version)]
#[command(about = "Tick-driven closed-loop motor control demo")]
struct Args {
    /// Path to the drive configuration TOML.
    #[arg(default_value = "config/rove.toml")]
    config: PathBuf,

    /// How long to run the loop [s].
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("ROVE Drive v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("ROVE Drive shutdown complete");
}

fn setup_tracing(args: &Args) {
    let default_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    info!(
        "Config OK: period={}s, motors={}",
        config.control.period_s,
        config.motors.len()
    );
    if config.motors.is_empty() {
        warn!("No motors configured; the loop will tick an empty registry");
    }

    let sched = Scheduler::new();
    let motors = spawn_motors(&sched, &config);

    // A small promise-sequenced routine: wait for init to settle, command a
    // velocity on every motor, hold it for a second, then stop everything.
    let routine_motors = motors.clone();
    let routine_sched = sched.clone();
    let routine = Promise::timeout(&sched, 0.1)?.then_promise(move || {
        for motor in &routine_motors {
            if let Err(e) = motor.borrow_mut().set_velocity(2.0) {
                warn!(motor = motor.borrow().name(), error = %e, "velocity command failed");
            }
        }
        info!("Velocity targets set");
        let stop_motors = routine_motors.clone();
        let hold = Promise::timeout(&routine_sched, 1.0).unwrap_or_else(|_| Promise::immediate());
        hold.then(move || {
            for motor in &stop_motors {
                if let Err(e) = motor.borrow_mut().stop() {
                    warn!(motor = motor.borrow().name(), error = %e, "stop failed");
                }
            }
            info!("Motors stopped");
        });
        hold
    });
    routine.then(|| info!("Routine complete"));

    // Fixed-period loop standing in for the surrounding real-time driver.
    let period = config.control.period_s;
    let passes = (args.duration / period).ceil() as u64;
    for _ in 0..passes {
        std::thread::sleep(Duration::from_secs_f64(period));
        let report = sched.tick(period);
        for failure in &report.failures {
            warn!(?failure, "tick failure");
        }
    }

    let stats = sched.stats();
    info!(
        "Loop done: {} ticks, {} callbacks, {} component ticks, {} failures",
        stats.ticks, stats.callbacks_fired, stats.component_ticks, stats.failures
    );
    for motor in &motors {
        let mut motor = motor.borrow_mut();
        let revs = motor.revolutions()?;
        info!("Motor {} final position: {:.3} rev", motor.name(), revs);
    }

    // Drain pending work and stop every motor via its cleanup.
    sched.shutdown();
    Ok(())
}

type SharedMotor = Rc<std::cell::RefCell<Motor<SimulatedMotor>>>;

fn spawn_motors(sched: &Scheduler, config: &DriveConfig) -> Vec<SharedMotor> {
    let mut sims = Vec::new();
    let mut motors = Vec::new();
    for entry in &config.motors {
        // 2 rev/s per volt with a 50 ms response: a small geared DC motor.
        let sim = SimulatedMotor::new(2.0, 0.05);
        sims.push(sim.clone());
        motors.push(Motor::spawn_from_config(sched, entry, sim));
        info!(motor = %entry.name, reversed = entry.reversed, "motor spawned");
    }
    // The plant advances physics after the motors have written voltages.
    sched.register(Rc::new(std::cell::RefCell::new(SimPlant::new(sims))));
    motors
}
