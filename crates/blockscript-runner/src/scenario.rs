//! Scenario files: who is online, what stands around them and what happens on which tick.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::str::FromStr;

use blockscript_lang::{ActorId, EventKind};
use blockscript_runtime::{ActorInfo, HostEvent, Location, MemoryHost};
use eyre::{WrapErr, eyre};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_world")]
    pub world: String,
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

#[derive(Debug, Deserialize)]
pub struct Position {
    pub world: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Deserialize)]
pub struct ActorSpec {
    /// Must match the owner id of the actor's script file.
    pub id: ActorId,
    pub name: String,
    pub position: Position,
    #[serde(default = "full_health")]
    pub health: f64,
}

#[derive(Debug, Deserialize)]
pub struct EntitySpec {
    pub kind: String,
    pub position: Position,
}

/// One event as written in the file. Participants are named, not numbered.
#[derive(Debug, Deserialize)]
pub struct EventSpec {
    pub tick: u64,
    pub kind: String,
    pub actor: String,
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// An event ready for dispatch on `tick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub tick: u64,
    pub event: HostEvent,
}

fn default_world() -> String {
    "world".to_string()
}

const fn full_health() -> f64 {
    20.0
}

impl Scenario {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&text).wrap_err_with(|| format!("parsing scenario {}", path.display()))
    }

    fn location(&self, position: &Position) -> Location {
        let world = position.world.as_deref().unwrap_or(&self.world);
        Location::new(world, position.x, position.y, position.z)
    }

    /// A host with every actor online and every entity spawned.
    pub fn host(&self) -> MemoryHost {
        let mut host = MemoryHost::new(self.world.clone());
        for actor in &self.actors {
            host.insert_actor(ActorInfo {
                id: actor.id,
                name: actor.name.clone(),
                location: self.location(&actor.position),
                health: actor.health,
                food: 20,
                level: 0,
            });
        }
        for entity in &self.entities {
            host.add_entity(entity.kind.clone(), self.location(&entity.position));
        }
        host
    }

    /// Events in tick order, with names resolved to actor ids.
    pub fn timeline(&self) -> eyre::Result<VecDeque<TimedEvent>> {
        let ids: BTreeMap<&str, ActorId> = self
            .actors
            .iter()
            .map(|actor| (actor.name.as_str(), actor.id))
            .collect();
        let id_of = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| eyre!("unknown actor '{name}'"))
        };

        let mut timeline = self
            .events
            .iter()
            .map(|spec| {
                let kind = EventKind::from_str(&spec.kind)
                    .map_err(|_| eyre!("unknown event kind '{}'", spec.kind))?;
                let mut event = HostEvent::new(kind, id_of(&spec.actor)?);
                for (role, name) in &spec.roles {
                    event = event.with_role(role.clone(), id_of(name)?);
                }
                for (key, value) in &spec.data {
                    event = event.with_data(key.clone(), value.clone());
                }
                Ok(TimedEvent {
                    tick: spec.tick,
                    event,
                })
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        timeline.sort_by_key(|timed| timed.tick);
        Ok(timeline.into())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use blockscript_runtime::{EngineConfig, Host, JsonFileStore, Session};

    use super::*;

    fn demo(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos").join(name)
    }

    const SCENARIO: &str = r#"{
        "world": "lobby",
        "actors": [
            { "id": "7d1f7a52-2f54-4b7e-9a57-0f2d8f7f3c11", "name": "alex", "position": { "x": 0, "y": 64, "z": 0 } },
            { "id": "2b0c6c9e-51a4-4d3a-9c89-3a1f0e6f2d20", "name": "bea", "position": { "world": "arena", "x": 4, "y": 64, "z": 0 } }
        ],
        "entities": [ { "kind": "zombie", "position": { "x": 3, "y": 64, "z": 0 } } ],
        "events": [
            { "tick": 5, "kind": "damage", "actor": "alex", "roles": { "damager": "bea" } },
            { "tick": 1, "kind": "JOIN", "actor": "alex", "data": { "motd": "hi" } }
        ]
    }"#;

    #[test]
    fn test_host_and_timeline() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let host = scenario.host();
        assert_eq!(host.online_actors().len(), 2);
        assert_eq!(host.actor_by_name("bea").unwrap().location.world, "arena");
        assert_eq!(host.entities_near(&Location::new("lobby", 0.0, 64.0, 0.0), 5.0).len(), 1);

        let timeline = scenario.timeline().unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].tick, 1);
        assert_eq!(timeline[0].event.kind, EventKind::Join);
        assert_eq!(timeline[0].event.data["motd"], "hi");
        assert_eq!(timeline[1].event.roles["damager"], scenario.actors[1].id);
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let mut scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        scenario.events[0].actor = "carl".into();
        assert!(scenario.timeline().unwrap_err().to_string().contains("carl"));

        scenario.events[0].actor = "alex".into();
        scenario.events[0].kind = "EXPLODE".into();
        assert!(scenario.timeline().unwrap_err().to_string().contains("EXPLODE"));
    }

    #[test]
    fn test_demo_scenario_replays() {
        let scenario = Scenario::load(&demo("scenario.json")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let file = "7d1f7a52-2f54-4b7e-9a57-0f2d8f7f3c11.json";
        std::fs::copy(demo("scripts").join(file), dir.path().join(file)).unwrap();

        let store = JsonFileStore::open(dir.path()).unwrap();
        let mut session = Session::new(scenario.host(), store, EngineConfig::seeded(1));
        let mut timeline = scenario.timeline().unwrap();
        let alex = scenario.actors[0].id;
        let bea = scenario.actors[1].id;

        let mut heard = Vec::new();
        for _ in 0..59 {
            let tick = session.tick();
            while timeline.front().is_some_and(|timed| timed.tick <= tick) {
                if let Some(timed) = timeline.pop_front() {
                    session.dispatch(&timed.event);
                }
            }
            heard.extend(session.host_mut().take_messages(alex));
        }

        assert_eq!(heard, [
            "Welcome back alex, visit number 1",
            "heartbeat #1",
            "heartbeat #2",
            "You took down bea for 10 coins",
            "heartbeat #3",
            "heartbeat #4",
            "heartbeat #5",
            "Nobody answered.",
        ]);
        assert_eq!(session.host().messages(bea), ["alex asks: anyone around?"]);
        assert_eq!(session.flush_all().unwrap(), 1);
    }
}
