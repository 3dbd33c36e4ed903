//! # Thruster Interface Executable
//!
//! This executable converts per-thruster force demands into ESC signals and
//! sends them over I2C at a fixed rate. Demands come from a force script
//! given on the command line, without one the thrusters are held at zero
//! force.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use thr_lib::{
    cycle_archive::{CycleArchive, CycleRecord},
    thr_driver::{self, ThrusterDriver},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    script_interpreter::{ForceScript, PendingForces},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.05;


// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "thr_exec", about = "Thruster interface executable")]
struct Args {
    /// Force script to replay, the thrusters are held at zero force if not
    /// given
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Parameter file, relative to the software root's params directory
    #[structopt(short, long, default_value = "thr_exec.toml")]
    params: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "thr_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger, the file gets every cycle's signals
    logger_init(LevelFilter::Trace, LevelFilter::Info, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Thruster Interface Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| String::from("unknown host"))
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let params: thr_driver::Params = util::params::load(&args.params)
        .wrap_err("Could not load thruster driver params")?;

    session.save("thr_driver_params.json", params.clone());

    info!("Parameters loaded");

    // ---- INITIALISE DRIVER ----

    let bus = thr_driver::open_i2c_bus(params.i2c_bus, params.bus_timeout_ms);

    let mut driver = ThrusterDriver::new(&params, bus)
        .wrap_err("Failed to initialise the thruster driver")?;

    info!("Thruster driver initialised");

    let mut cycle_arch = CycleArchive::new(&session, "thr_driver/cycles.csv", driver.num_channels())
        .wrap_err("Failed to create the cycle archive")?;

    // ---- INITIALISE DEMAND SOURCE ----

    let mut script = match args.script {
        Some(ref path) => {
            let s = ForceScript::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script {:?}, lasts {:.02} s and contains {} demands\n",
                s.script_path(),
                s.get_duration(),
                s.num_demands()
            );

            if s.num_channels() != driver.num_channels() {
                warn!(
                    "Script demands {} forces but there are {} thrusters, \
                    its demands will be rejected",
                    s.num_channels(),
                    driver.num_channels()
                );
            }

            Some(s)
        },
        None => {
            info!("No script provided, thrusters will be held at zero force\n");
            None
        }
    };

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop");

    let mut forces = vec![0.0; driver.num_channels()];
    let mut thrusters_offline = false;
    let mut num_cycles: u64 = 0;

    loop {
        let cycle_start_instant = Instant::now();

        // ---- DEMANDS ----

        if let Some(ref mut s) = script {
            match s.get_pending(session::get_elapsed_seconds()) {
                PendingForces::None => (),
                PendingForces::Some(f) => {
                    debug!("New force demand: {:?}", f);
                    forces = f;
                },
                PendingForces::EndOfScript => {
                    info!("End of force script reached, stopping");
                    break
                }
            }
        }

        // ---- DRIVE ----

        let result = driver.drive(&forces);

        match result {
            Ok(_) => {
                if thrusters_offline {
                    info!("Thruster bus is back, thrusters online");
                    thrusters_offline = false;
                }
            },
            Err(ref e) if e.is_bus_unavailable() => {
                if !thrusters_offline {
                    warn!("Thrusters offline: {}", e);
                    thrusters_offline = true;
                }
            },
            Err(ref e) => warn!("Drive cycle failed: {}", e)
        }

        // ---- WRITE ARCHIVES ----

        let record = CycleRecord::from_drive(
            session::get_elapsed_seconds(),
            &forces,
            &result,
            &driver
        );
        if let Err(e) = cycle_arch.record(record) {
            warn!("Could not archive the cycle: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S)
            .checked_sub(cycle_dur)
        {
            Some(d) => thread::sleep(d),
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
            }
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    match driver.stop() {
        Ok(s) => info!("Zero force commanded, signals: {:?}", s),
        Err(e) => warn!("Could not command zero force: {}", e)
    }

    info!("{} cycles run, {} frames sent", num_cycles, driver.frames_sent());
    info!("End of execution");

    session.exit();

    Ok(())
}
