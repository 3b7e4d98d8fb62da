//! An in-memory [`Host`] for tests and the headless runner.

use std::collections::BTreeMap;
use std::sync::Arc;

use blockscript_lang::ActorId;
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::context::ExecutionContext;
use crate::error::HostError;
use crate::host::{ActorInfo, EntityId, EntityInfo, Host, SideEffects};
use crate::value::{Location, RuntimeValue};

/// A world made of plain maps.
///
/// Actors keep their insertion order so "all online" and nearest-tie results are stable.
#[derive(Debug, Default)]
pub struct MemoryHost {
    default_world: String,
    actors: Vec<ActorInfo>,
    entities: Vec<EntityInfo>,
    next_entity: u64,
    messages: HashMap<ActorId, Vec<String>>,
    off_tick_thread: bool,
}

impl MemoryHost {
    #[must_use]
    pub fn new(default_world: impl Into<String>) -> Self {
        Self {
            default_world: default_world.into(),
            ..Self::default()
        }
    }

    /// Bring a new actor online with full health.
    pub fn add_actor(&mut self, name: impl Into<String>, location: Location) -> ActorId {
        let id = ActorId::new();
        self.insert_actor(ActorInfo {
            id,
            name: name.into(),
            location,
            health: 20.0,
            food: 20,
            level: 0,
        });
        id
    }

    /// Bring an actor online (or replace their snapshot).
    pub fn insert_actor(&mut self, info: ActorInfo) {
        match self.actors.iter_mut().find(|a| a.id == info.id) {
            Some(existing) => *existing = info,
            None => self.actors.push(info),
        }
    }

    /// Take an actor offline. Their received messages are kept.
    pub fn remove_actor(&mut self, id: ActorId) -> Option<ActorInfo> {
        let index = self.actors.iter().position(|a| a.id == id)?;
        Some(self.actors.remove(index))
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut ActorInfo> {
        self.actors.iter_mut().find(|a| a.id == id)
    }

    pub fn add_entity(&mut self, kind: impl Into<String>, location: Location) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.entities.push(EntityInfo {
            id,
            kind: kind.into(),
            location,
        });
        id
    }

    pub fn remove_entity(&mut self, id: EntityId) {
        self.entities.retain(|e| e.id != id);
    }

    /// Messages delivered to `actor`, oldest first.
    #[must_use]
    pub fn messages(&self, actor: ActorId) -> &[String] {
        self.messages.get(&actor).map(Vec::as_slice).unwrap_or_default()
    }

    /// Take and clear the messages delivered to `actor`.
    pub fn take_messages(&mut self, actor: ActorId) -> Vec<String> {
        self.messages.remove(&actor).unwrap_or_default()
    }

    /// Pretend calls come from a background thread.
    pub fn set_tick_thread(&mut self, on_tick_thread: bool) {
        self.off_tick_thread = !on_tick_thread;
    }
}

impl Host for MemoryHost {
    fn actor(&self, id: ActorId) -> Option<ActorInfo> {
        self.actors.iter().find(|a| a.id == id).cloned()
    }

    fn actor_by_name(&self, name: &str) -> Option<ActorInfo> {
        self.actors
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn online_actors(&self) -> Vec<ActorInfo> {
        self.actors.clone()
    }

    fn entity(&self, id: EntityId) -> Option<EntityInfo> {
        self.entities.iter().find(|e| e.id == id).cloned()
    }

    fn entities_near(&self, center: &Location, radius: f64) -> Vec<EntityInfo> {
        self.entities
            .iter()
            .filter(|e| center.within(&e.location, radius))
            .cloned()
            .collect()
    }

    fn set_transform(&mut self, actor: ActorId, location: Location) -> Result<(), HostError> {
        let info = self
            .actor_mut(actor)
            .ok_or_else(|| HostError::ActorOffline(actor.to_string()))?;
        info.location = location;
        Ok(())
    }

    fn send_message(&mut self, actor: ActorId, message: &str) {
        tracing::trace!("Message to {actor}: {message}");
        self.messages
            .entry(actor)
            .or_default()
            .push(message.to_string());
    }

    fn default_world(&self) -> String {
        self.default_world.clone()
    }

    fn is_tick_thread(&self) -> bool {
        !self.off_tick_thread
    }
}

/// A side effect as it reached the handler.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformedEffect {
    pub actor: ActorId,
    pub kind: String,
    pub parameters: BTreeMap<String, RuntimeValue>,
}

/// Records every side effect. Cloning shares the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingEffects {
    performed: Arc<Mutex<Vec<PerformedEffect>>>,
    failing: Arc<Mutex<HashMap<String, String>>>,
}

impl RecordingEffects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `kind` effect fail with `reason`.
    pub fn fail(&self, kind: impl Into<String>, reason: impl Into<String>) {
        self.failing.lock().insert(kind.into(), reason.into());
    }

    #[must_use]
    pub fn performed(&self) -> Vec<PerformedEffect> {
        self.performed.lock().clone()
    }
}

impl SideEffects for RecordingEffects {
    fn perform(
        &mut self,
        kind: &str,
        parameters: &BTreeMap<String, RuntimeValue>,
        context: &ExecutionContext,
    ) -> Result<(), String> {
        if let Some(reason) = self.failing.lock().get(kind) {
            return Err(reason.clone());
        }
        self.performed.lock().push(PerformedEffect {
            actor: context.actor(),
            kind: kind.to_string(),
            parameters: parameters.clone(),
        });
        Ok(())
    }
}
