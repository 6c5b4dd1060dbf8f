use bevy::prelude::*;
use rand::Rng;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::fs;
use std::path::{Path, PathBuf};

use warden::coverage::simulation::{CoverageState, CoverageTick, LayoutChanged};
use warden::coverage::{CoveragePlugin, Roster, TargetId, WallLayout};

const LOG_PREFIX: &str = "warden";
const KEEP_LOGS: usize = 25;
const JITTER: f32 = 0.1;

fn setup_file_logging() -> std::io::Result<String> {
    let log_dir = PathBuf::from("logs");
    fs::create_dir_all(&log_dir)?;

    // Clean up old log files, keeping only the most recent ones
    cleanup_old_logs(&log_dir, KEEP_LOGS);

    let now = chrono::Local::now();
    let log_filename = format!("{}_{}.log", LOG_PREFIX, now.format("%Y%m%d_%H%M%S"));
    let log_path_str = log_dir.join(&log_filename).to_string_lossy().to_string();

    let file_appender = RollingFileAppender::new(
        Rotation::NEVER, // One file per run
        &log_dir,
        &log_filename,
    );

    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(log_path_str)
}

fn cleanup_old_logs(log_dir: &Path, keep_count: usize) {
    if let Ok(entries) = fs::read_dir(log_dir) {
        let mut log_files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|s| s.starts_with(LOG_PREFIX) && s.ends_with(".log"))
                    .unwrap_or(false)
            })
            .collect();

        // Oldest first
        log_files.sort_by_key(|e| e.metadata().ok().and_then(|m| m.modified().ok()));

        if log_files.len() > keep_count {
            for file in log_files.iter().take(log_files.len() - keep_count) {
                let _ = fs::remove_file(file.path());
            }
        }
    }
}

/// Scripted sightings: four responders, targets that drift, leap, appear and
/// vanish.
fn apply_script(step: usize, roster: &mut Roster) {
    match step {
        0 => {
            roster.upsert_agent("Alice", Vec2::new(0.5, 0.5));
            roster.upsert_agent("Bob", Vec2::new(10.0, 0.5));
            roster.upsert_agent("Charlie", Vec2::new(5.0, 8.0));
            roster.upsert_agent("Diana", Vec2::new(2.0, 5.5));

            roster.upsert_target(101, Vec2::new(1.0, 1.0), 0.95);
            roster.upsert_target(102, Vec2::new(9.0, 1.0), 0.88);
            roster.upsert_target(103, Vec2::new(5.0, 9.0), 0.70);
            info!("[DEMO] Step 0: 4 responders, 3 targets");
        }
        1 => {
            roster.upsert_target(102, Vec2::new(9.3, 1.2), 0.88);
            info!("[DEMO] Step 1: target 102 drifts (holder should stay)");
        }
        2 => {
            roster.upsert_target(102, Vec2::new(5.5, 7.5), 0.88);
            info!("[DEMO] Step 2: target 102 leaps next to Charlie (holder should change)");
        }
        3 => {
            roster.upsert_target(104, Vec2::new(2.5, 4.5), 0.60);
            info!("[DEMO] Step 3: target 104 appears");
        }
        4 => {
            roster.remove_target(TargetId(101));
            info!("[DEMO] Step 4: target 101 removed");
        }
        _ => {}
    }
}

/// Small random walk so hysteresis has something to resist.
fn jitter_agents(roster: &mut Roster, rng: &mut impl Rng) {
    for agent in &mut roster.agents {
        agent.position += Vec2::new(rng.random_range(-JITTER..JITTER), rng.random_range(-JITTER..JITTER));
        agent.position = agent.position.max(Vec2::ZERO);
    }
}

fn main() {
    let log_file = match setup_file_logging() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            std::process::exit(1);
        }
    };

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Warden coverage demo - Logging to file                  ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  Log file: {:<45} ║", log_file);
    println!("╚══════════════════════════════════════════════════════════╝");

    let with_walls = std::env::args().any(|arg| arg == "--walls");

    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(CoveragePlugin);

    // Startup: config + search resources
    app.update();

    if with_walls {
        app.world_mut().write_message(LayoutChanged {
            layout: WallLayout::demo_room(),
        });
    }

    let mut rng = rand::rng();
    for step in 0..6 {
        {
            let mut roster = app.world_mut().resource_mut::<Roster>();
            roster.observed_at = step as f64 * 0.1;
            apply_script(step, &mut roster);
            jitter_agents(&mut roster, &mut rng);
        }

        app.world_mut().run_schedule(FixedUpdate);

        let tick = app.world().resource::<CoverageTick>().0;
        let Some(output) = &app.world().resource::<CoverageState>().latest else {
            continue;
        };
        match serde_json::to_string_pretty(output) {
            Ok(json) => info!("[DEMO] Tick {} output:\n{}", tick, json),
            Err(e) => error!("[DEMO] Failed to serialize tick {}: {}", tick, e),
        }
    }
}
