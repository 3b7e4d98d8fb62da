//! Capabilities the engine needs from the world it runs in.

use std::collections::BTreeMap;

use blockscript_lang::ActorId;

use crate::context::ExecutionContext;
use crate::error::HostError;
use crate::value::{Location, RuntimeValue};

/// Identity of a non-actor entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Snapshot of an online actor.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorInfo {
    pub id: ActorId,
    pub name: String,
    pub location: Location,
    pub health: f64,
    pub food: u32,
    pub level: u32,
}

/// Snapshot of a non-actor entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub kind: String,
    pub location: Location,
}

/// The host world.
///
/// All calls happen on the tick thread. The engine never caches what it reads: an actor that
/// went offline simply stops resolving.
pub trait Host {
    fn actor(&self, id: ActorId) -> Option<ActorInfo>;

    /// Case-insensitive lookup among online actors.
    fn actor_by_name(&self, name: &str) -> Option<ActorInfo>;

    fn online_actors(&self) -> Vec<ActorInfo>;

    fn entity(&self, id: EntityId) -> Option<EntityInfo>;

    /// Non-actor entities within `radius` of `center`.
    fn entities_near(&self, center: &Location, radius: f64) -> Vec<EntityInfo>;

    /// Move an actor (location plus yaw/pitch).
    fn set_transform(&mut self, actor: ActorId, location: Location) -> Result<(), HostError>;

    fn send_message(&mut self, actor: ActorId, message: &str);

    /// World used for locations that do not name one.
    fn default_world(&self) -> String;

    /// Whether the caller is on the synchronous tick thread.
    fn is_tick_thread(&self) -> bool {
        true
    }
}

/// Opaque subsystems (economy, notifications, menus, ...) reached through `SIDE_EFFECT` blocks.
pub trait SideEffects {
    /// Perform `kind` with already-resolved parameters. `Err` carries a user-facing reason.
    fn perform(
        &mut self,
        kind: &str,
        parameters: &BTreeMap<String, RuntimeValue>,
        context: &ExecutionContext,
    ) -> Result<(), String>;
}

/// Rejects every side effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSideEffects;

impl SideEffects for NoSideEffects {
    fn perform(
        &mut self,
        kind: &str,
        _parameters: &BTreeMap<String, RuntimeValue>,
        _context: &ExecutionContext,
    ) -> Result<(), String> {
        Err(format!("no handler for side effect '{kind}'"))
    }
}
