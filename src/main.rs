use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{debug, error, info, warn};

use ledge::config::{FIXED_DT, TUNING_ENV_VAR};
use ledge::coordinator::{PhysicsCoordinator, PhysicsWorld, RequestCoordinator};
use ledge::engine::SimClock;
use ledge::scene::load_test_scene;
use ledge::{Controller, EventBus, MovementEvent, Tuning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Script {
    /// Walk right, take a long jump, turn around and hop.
    WalkJump,
    /// Walk straight into the bottomless gap.
    Gap,
    /// Flip direction every tick to trip the rate and oscillation guards.
    Spam,
}

#[derive(Parser)]
#[command(name = "ledge", about = "Headless movement/physics harness")]
struct Args {
    /// Tuning file (TOML). Falls back to $LEDGE_TUNING, then built-in defaults.
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Fixed steps to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    #[arg(long, value_enum, default_value_t = Script::WalkJump)]
    script: Script,

    /// Make the first N movement requests fail, exercising retry and fallback.
    #[arg(long, default_value_t = 0)]
    fail_requests: u32,

    /// Simulated wall-clock seconds per frame; the fixed-step clock drains it.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_time: f32,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

fn load_tuning(args: &Args) -> Tuning {
    let path = args
        .tuning
        .clone()
        .or_else(|| std::env::var_os(TUNING_ENV_VAR).map(PathBuf::from));
    let Some(path) = path else {
        return Tuning::default();
    };
    match Tuning::load(&path) {
        Ok(tuning) => {
            info!(path = %path.display(), "tuning loaded");
            tuning
        }
        Err(error) => {
            error!(%error, "falling back to default tuning");
            Tuning::default()
        }
    }
}

/// Raw input for tick `tick`: (action name, pressed).
fn script_input(script: Script, tick: u64) -> Vec<(&'static str, bool)> {
    match script {
        Script::WalkJump => match tick {
            10 => vec![("move_right", true)],
            40 => vec![("jump", true)],
            55 => vec![("jump", false)],
            90 => vec![("move_right", false)],
            120 => vec![("move_left", true)],
            150 => vec![("jump", true)],
            152 => vec![("jump", false)],
            200 => vec![("move_left", false), ("dash", true)],
            201 => vec![("dash", false)],
            _ => Vec::new(),
        },
        Script::Gap => match tick {
            10 => vec![("move_right", true)],
            _ => Vec::new(),
        },
        Script::Spam => {
            if !(10..130).contains(&tick) {
                return if tick == 130 { vec![("move_left", false), ("move_right", false)] } else { Vec::new() };
            }
            if tick % 2 == 0 {
                vec![("move_left", false), ("move_right", true)]
            } else {
                vec![("move_right", false), ("move_left", true)]
            }
        }
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let tuning = load_tuning(&args);
    let mut world = PhysicsWorld::new(&tuning);
    let mut movement = RequestCoordinator::new(tuning.validation);
    let scene = load_test_scene(&mut world);

    let events = EventBus::new();
    let mut event_rx = events.subscribe();
    let mut controller = Controller::new(scene.player, &tuning, scene.spawn, events);
    if args.fail_requests > 0 {
        movement.inject_failures(scene.player, args.fail_requests);
    }

    let frame_time = if args.frame_time > 0.0 {
        args.frame_time
    } else {
        warn!(frame_time = args.frame_time, "frame time must be positive, using the fixed step");
        FIXED_DT
    };

    info!(script = ?args.script, ticks = args.ticks, frame_time, "simulation start");
    let mut clock = SimClock::new(FIXED_DT);
    let dt = clock.step();
    while clock.ticks() < args.ticks {
        let due = clock.advance(frame_time);
        for _ in 0..due {
            if clock.ticks() >= args.ticks {
                break;
            }
            let tick = clock.ticks();
            for (name, down) in script_input(args.script, tick) {
                if let Err(error) = controller.input_mut().set_named(name, down) {
                    warn!(tick, %error, "scripted input ignored");
                }
            }

            let now = clock.tick();
            controller.update(&mut world, &mut movement, now, dt);
            let report = world.step(dt);
            if report.repaired_bodies > 0 {
                warn!(tick, repaired = report.repaired_bodies, "accumulation sweep repaired bodies");
            }

            while let Ok(event) = event_rx.try_recv() {
                match event {
                    MovementEvent::Landed { position, velocity, surface, .. } => {
                        info!(tick, %position, impact = velocity.y, ?surface, "landed")
                    }
                    MovementEvent::Jumped { force, coyote, buffered, .. } => {
                        info!(tick, force, coyote, buffered, "jumped")
                    }
                    MovementEvent::Respawned { position, reason, .. } => {
                        info!(tick, %position, ?reason, "respawned")
                    }
                }
            }
        }
        debug!(steps = due, alpha = clock.alpha(), "frame");
    }

    let stats = movement.validator().global_stats();
    info!(
        ticks = clock.ticks(),
        elapsed = clock.now(),
        state = ?controller.state(),
        position = ?world.position(scene.player),
        velocity = ?world.velocity(scene.player),
        requests = stats.total,
        pass_rate = stats.pass_rate(),
        "simulation finished"
    );
}
