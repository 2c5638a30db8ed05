//! Tick loop and interactive command handling.
//!
//! The runner stands in for the host game: it owns the world state, applies
//! stdin commands to it, and feeds the engine one snapshot per tick.

use std::collections::HashMap;
use std::error::Error;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::ArgMatches;
use log::{info, warn};

use leitmotif_lib::constants::{OVERLAY_PLAYER, PRIMARY_PLAYER};
use leitmotif_lib::engine::{Engine, WorldSnapshot};
use leitmotif_lib::signal::SignalId;

use crate::scenario;
use crate::source::DirectorySource;

/// One parsed stdin command.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Set(String, bool),
    Location(String),
    Region(String),
    Near(String, u32),
    Blacklist(bool),
    Volume(f32),
    Pause,
    Resume,
    Stop,
    Start,
    Switch,
    Status,
    Quit,
}

/// Host-side world state the commands mutate between ticks.
struct World {
    updates: Vec<(SignalId, bool)>,
    location: String,
    region: String,
    proximity: HashMap<String, u32>,
    blacklisted: bool,
    volume: f32,
    paused: bool,
}

impl World {
    fn snapshot(&mut self) -> WorldSnapshot {
        WorldSnapshot {
            signal_updates: std::mem::take(&mut self.updates),
            location_label: self.location.clone(),
            region_label: self.region.clone(),
            proximity: self.proximity.clone(),
            blacklisted: self.blacklisted,
            host_volume: self.volume,
            host_paused: self.paused,
        }
    }
}

pub fn run(args: &ArgMatches) -> Result<i32, Box<dyn Error>> {
    let scenario_path = args
        .get_one::<String>("scenario")
        .ok_or("missing scenario path")?;
    let scenario = scenario::load(Path::new(scenario_path))?;

    let music_dir = match args.get_one::<String>("music-dir") {
        Some(dir) => PathBuf::from(dir),
        None => Path::new(scenario_path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let gain: f32 = args
        .get_one::<String>("gain")
        .map(|value| value.parse())
        .transpose()?
        .unwrap_or(70.0);
    let tick_ms: u64 = args
        .get_one::<String>("tick-ms")
        .map(|value| value.parse())
        .transpose()?
        .unwrap_or(50);
    let max_ticks: Option<u64> = args
        .get_one::<String>("ticks")
        .map(|value| value.parse())
        .transpose()?;

    let mut engine = Engine::new(
        scenario.config.clone(),
        Arc::new(DirectorySource::new(music_dir)),
    )?;

    let mut signal_ids: HashMap<String, SignalId> = HashMap::new();
    for name in &scenario.signals {
        signal_ids.insert(name.clone(), engine.register_signal(name));
    }
    for entry in scenario.entries {
        engine.register_entry(entry)?;
    }

    for player in [PRIMARY_PLAYER, OVERLAY_PLAYER] {
        if let Some(player) = engine.players().get(player) {
            player.set_gain_percent(gain / 100.0);
        }
    }

    let mut world = World {
        updates: scenario
            .initial_signals
            .iter()
            .filter_map(|name| signal_ids.get(name).map(|id| (*id, true)))
            .collect(),
        location: scenario.location,
        region: scenario.region,
        proximity: HashMap::new(),
        blacklisted: false,
        volume: 1.0,
        paused: false,
    };

    let commands = spawn_stdin_reader();
    info!(
        "running '{}'; commands: set <signal> on|off, location <text>, region <text>, \
         near <key> <count>, blacklist on|off, volume <0-1>, pause, resume, stop, start, \
         switch, status, quit",
        scenario_path
    );

    let mut last_track: Option<String> = None;
    let mut ticks: u64 = 0;
    'ticking: loop {
        loop {
            match commands.try_recv() {
                Ok(line) => {
                    let Some(command) = parse_command(&line) else {
                        warn!("unrecognized command: {}", line.trim());
                        continue;
                    };
                    if command == Command::Quit {
                        break 'ticking;
                    }
                    apply_command(command, &mut world, &mut engine, &signal_ids);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if max_ticks.is_none() {
                        // Nothing can ever ask us to stop; bail out now.
                        break 'ticking;
                    }
                    break;
                }
            }
        }

        engine.tick(world.snapshot());

        let track = engine.current_track().map(str::to_string);
        if track != last_track {
            match (&track, engine.current_entry_label()) {
                (Some(name), Some(label)) => info!("now playing '{}' ({})", name, label),
                (Some(name), None) => info!("now playing '{}'", name),
                (None, _) => info!("soundtrack idle"),
            }
            last_track = track;
        }

        ticks += 1;
        if let Some(limit) = max_ticks {
            if ticks >= limit {
                break;
            }
        }
        thread::sleep(Duration::from_millis(tick_ms));
    }

    engine.shutdown();
    Ok(0)
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn apply_command(
    command: Command,
    world: &mut World,
    engine: &mut Engine,
    signal_ids: &HashMap<String, SignalId>,
) {
    match command {
        Command::Set(name, value) => match signal_ids.get(&name) {
            Some(id) => world.updates.push((*id, value)),
            None => warn!("unknown signal: {}", name),
        },
        Command::Location(label) => world.location = label,
        Command::Region(label) => world.region = label,
        Command::Near(key, count) => {
            world.proximity.insert(key, count);
        }
        Command::Blacklist(value) => world.blacklisted = value,
        Command::Volume(volume) => world.volume = volume.clamp(0.0, 1.0),
        Command::Pause => world.paused = true,
        Command::Resume => world.paused = false,
        Command::Stop => engine.force_stop(),
        Command::Start => engine.force_start(),
        Command::Switch => engine.force_switch(),
        Command::Status => print_status(engine),
        Command::Quit => {}
    }
}

fn print_status(engine: &Engine) {
    println!(
        "track: {}  entry: {}  overlay: {}",
        engine.current_track().unwrap_or("-"),
        engine.current_entry_label().unwrap_or_else(|| "-".to_string()),
        engine.is_overlay_active(),
    );
    for name in [PRIMARY_PLAYER, OVERLAY_PLAYER] {
        if let Some(snapshot) = engine.gain_snapshot(name) {
            println!(
                "  {}: user={:.2} duck={:.2} quiet={:.2} fade={:.2} mute={}",
                name, snapshot.user, snapshot.duck, snapshot.quiet, snapshot.fade, snapshot.mute
            );
        }
    }
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "set" => {
            let name = parts.next()?.to_string();
            Command::Set(name, parse_switch(parts.next()?)?)
        }
        "location" => Command::Location(parts.next().unwrap_or_default().to_string()),
        "region" => Command::Region(parts.next().unwrap_or_default().to_string()),
        "near" => {
            let key = parts.next()?.to_string();
            Command::Near(key, parts.next()?.parse().ok()?)
        }
        "blacklist" => Command::Blacklist(parse_switch(parts.next()?)?),
        "volume" => Command::Volume(parts.next()?.parse().ok()?),
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "stop" => Command::Stop,
        "start" => Command::Start,
        "switch" => Command::Switch,
        "status" => Command::Status,
        "quit" | "q" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn parse_switch(word: &str) -> Option<bool> {
    match word {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}
