//! Event routing from host events to script lines.

use std::collections::BTreeMap;

use blockscript_lang::{ActorId, EventKind, Script};
use hashbrown::HashMap;

/// Unique identifier for a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u32);

impl HandlerId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A line waiting for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    pub id: HandlerId,
    /// Owner of the script the line belongs to.
    pub owner: ActorId,
    /// Index of the line in its script.
    pub line: usize,
}

/// Something that happened in the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    pub kind: EventKind,
    /// The acting entity. Only its own script reacts.
    pub actor: ActorId,
    /// Other participants by role (`victim`, `killer`, ...).
    pub roles: BTreeMap<String, ActorId>,
    /// Free-form payload, exposed as `%event_<key>%`.
    pub data: BTreeMap<String, String>,
}

impl HostEvent {
    #[must_use]
    pub const fn new(kind: EventKind, actor: ActorId) -> Self {
        Self {
            kind,
            actor,
            roles: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, actor: ActorId) -> Self {
        self.roles.insert(role.into(), actor);
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// The role the acting actor plays for an event kind, besides `player`.
#[must_use]
pub const fn actor_role(kind: EventKind) -> Option<&'static str> {
    match kind {
        EventKind::Damage => Some("victim"),
        EventKind::Attack => Some("damager"),
        EventKind::Kill => Some("killer"),
        EventKind::ProjectileHit => Some("shooter"),
        _ => None,
    }
}

/// `event kind → handlers`, in registration order.
#[derive(Debug, Default)]
pub struct Dispatcher {
    handlers: HashMap<EventKind, Vec<Handler>>,
    next_handler_id: u32,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every line of `script` that starts with an event, replacing any earlier
    /// registration of the same owner.
    ///
    /// Disabled lines and scripts are registered too; they are skipped when the event fires.
    pub fn register_script(&mut self, script: &Script) -> Vec<HandlerId> {
        self.unregister(script.owner_id);

        let mut ids = Vec::new();
        for (line, kind) in script
            .lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| Some((index, line.event_kind()?)))
        {
            let id = HandlerId(self.next_handler_id);
            self.next_handler_id += 1;
            self.handlers.entry(kind).or_default().push(Handler {
                id,
                owner: script.owner_id,
                line,
            });
            ids.push(id);
        }
        tracing::debug!("Registered {} handler(s) for {}", ids.len(), script.owner_id);
        ids
    }

    /// Drop every handler owned by `owner`. Returns how many were removed.
    pub fn unregister(&mut self, owner: ActorId) -> usize {
        let mut removed = 0;
        for handlers in self.handlers.values_mut() {
            let before = handlers.len();
            handlers.retain(|handler| handler.owner != owner);
            removed += before - handlers.len();
        }
        self.handlers.retain(|_, handlers| !handlers.is_empty());
        removed
    }

    #[must_use]
    pub fn handlers_for(&self, kind: EventKind) -> &[Handler] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Handlers that should run for `event`: the acting actor's own lines for that kind.
    pub fn matching<'a>(&'a self, event: &'a HostEvent) -> impl Iterator<Item = Handler> + 'a {
        self.handlers_for(event.kind)
            .iter()
            .filter(move |handler| handler.owner == event.actor)
            .copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
