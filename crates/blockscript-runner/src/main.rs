//! Headless BlockScript host
//!
//! This binary:
//! 1. Opens the scripts directory as a file-backed store
//! 2. Brings the scenario's actors and entities online
//! 3. Ticks the session at a fixed rate, feeding scenario events on their tick
//! 4. Saves every changed script on exit
//!
//! Environment:
//! - `SCRIPTS_DIR` - one `<owner>.json` per actor (default `scripts`)
//! - `EVENTS_FILE` - scenario file (default `scenario.json`)
//! - `TARGET_TPS` - ticks per second (default 20)
//! - `MAX_TICKS` - stop after this many ticks instead of when the scenario runs dry
//! - `ENGINE_CONFIG` - JSON file overriding engine limits
//! - `DENIED_EFFECTS` - comma separated side effect kinds that fail

mod effects;
mod scenario;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use blockscript_lang::EventKind;
use blockscript_runtime::{EngineConfig, Host, JsonFileStore, MemoryHost, ScriptStore, Session};
use eyre::WrapErr;
use tracing::{error, info};

use crate::effects::LoggingEffects;
use crate::scenario::{Scenario, TimedEvent};

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blockscript_runner=info".parse()?)
                .add_directive("blockscript_runtime=info".parse()?),
        )
        .init();

    info!("Starting BlockScript runner");

    let scripts_dir = std::env::var("SCRIPTS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("scripts"));
    let events_file = std::env::var("EVENTS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("scenario.json"));

    let target_tps: f32 = std::env::var("TARGET_TPS")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(20.0);
    let max_ticks: Option<u64> = std::env::var("MAX_TICKS")
        .ok()
        .and_then(|p| p.parse().ok());

    let config = load_config()?;
    let store = JsonFileStore::open(&scripts_dir)
        .wrap_err_with(|| format!("opening scripts directory {}", scripts_dir.display()))?;
    info!(
        "Scripts directory: {} ({} script(s))",
        scripts_dir.display(),
        store.owners()?.len()
    );

    let scenario = Scenario::load(&events_file)?;
    let mut timeline = scenario.timeline()?;
    info!(
        "Scenario {}: {} actor(s), {} event(s)",
        events_file.display(),
        scenario.actors.len(),
        timeline.len()
    );

    let effects = LoggingEffects::new(&std::env::var("DENIED_EFFECTS").unwrap_or_default());
    let mut session = Session::new(scenario.host(), store, config).with_side_effects(effects);

    let target_delta = Duration::from_secs_f32(1.0 / target_tps.max(1.0));

    loop {
        let start = Instant::now();

        let (tick, relayed) = step(&mut session, &mut timeline);
        for (name, message) in relayed {
            info!("[{}] {}", name, message);
        }

        let done = match max_ticks {
            Some(max) => tick >= max,
            None => {
                timeline.is_empty()
                    && session.scheduler().active_loops() == 0
                    && session.scheduler().pending_delays() == 0
            }
        };
        if done {
            info!("Stopping after tick {}", tick);
            break;
        }

        // Sleep to maintain target TPS
        let elapsed = start.elapsed();
        if elapsed < target_delta {
            std::thread::sleep(target_delta - elapsed);
        }
    }

    let saved = session.flush_all()?;
    info!("Saved {} script(s), shutting down", saved);
    Ok(())
}

fn load_config() -> eyre::Result<EngineConfig> {
    let Ok(path) = std::env::var("ENGINE_CONFIG") else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("reading engine config {path}"))?;
    let config: EngineConfig = serde_json::from_str(&text)
        .wrap_err_with(|| format!("parsing engine config {path}"))?;
    info!("Engine config: {:?}", config);
    Ok(config)
}

/// Advance the session one tick and dispatch the events due on it.
///
/// Returns the tick and every `(actor name, message)` scripts sent, including messages to actors
/// that quit on this tick.
fn step(
    session: &mut Session<MemoryHost>,
    timeline: &mut VecDeque<TimedEvent>,
) -> (u64, Vec<(String, String)>) {
    let tick = session.tick();
    let mut relayed = Vec::new();
    while let Some(timed) = timeline.pop_front() {
        if timed.tick > tick {
            timeline.push_front(timed);
            break;
        }
        session.dispatch(&timed.event);
        if timed.event.kind == EventKind::Quit {
            if let Err(e) = session.actor_departed(timed.event.actor) {
                error!("Failed to save script of {}: {}", timed.event.actor, e);
            }
            relayed.extend(take_messages(session.host_mut()));
            session.host_mut().remove_actor(timed.event.actor);
        }
    }
    relayed.extend(take_messages(session.host_mut()));
    (tick, relayed)
}

/// Drain what scripts said to each online actor.
fn take_messages(host: &mut MemoryHost) -> Vec<(String, String)> {
    let mut relayed = Vec::new();
    for actor in host.online_actors() {
        for message in host.take_messages(actor.id) {
            relayed.push((actor.name.clone(), message));
        }
    }
    relayed
}

#[cfg(test)]
mod tests {
    use blockscript_lang::{Block, BlockKind, Line, Script};
    use blockscript_runtime::{HostEvent, Location, MemoryStore};

    use super::*;

    #[test]
    fn test_messages_to_quitting_actor_are_relayed() {
        let mut host = MemoryHost::new("world");
        let alex = host.add_actor("alex", Location::new("world", 0.0, 64.0, 0.0));
        let mut session = Session::new(host, MemoryStore::new(), EngineConfig::seeded(1));

        let mut script = Script::new(alex, "alex");
        script.push_line(Line::new("farewell").with_blocks([
            Block::new(BlockKind::event(EventKind::Quit)),
            Block::new(BlockKind::message("Bye %player%")),
        ]));
        session.install_script(script).unwrap();

        let mut timeline = VecDeque::from([TimedEvent {
            tick: 1,
            event: HostEvent::new(EventKind::Quit, alex),
        }]);
        let (tick, relayed) = step(&mut session, &mut timeline);

        assert_eq!(tick, 1);
        assert_eq!(relayed, [("alex".to_string(), "Bye alex".to_string())]);
        assert!(session.host().actor(alex).is_none());
        assert!(timeline.is_empty());
    }
}
