//! The engine instance a host embeds.
//!
//! A [`Session`] owns every registry the engine needs: loaded scripts, event handlers, pending
//! asynchronous work and the active-loop table. There is no global state; two sessions never
//! see each other.
//!
//! # Example
//!
//! ```
//! use blockscript_lang::{Block, BlockKind, EventKind, Line, Script};
//! use blockscript_runtime::{EngineConfig, HostEvent, Location, MemoryHost, MemoryStore, Session};
//!
//! let mut host = MemoryHost::new("world");
//! let alex = host.add_actor("alex", Location::new("world", 0.0, 64.0, 0.0));
//! let mut session = Session::new(host, MemoryStore::new(), EngineConfig::default());
//!
//! let mut script = Script::new(alex, "alex");
//! script.push_line(Line::new("greet").with_blocks([
//!     Block::new(BlockKind::event(EventKind::Join)),
//!     Block::new(BlockKind::message("Welcome, %player%!")),
//! ]));
//! session.install_script(script).unwrap();
//!
//! session.dispatch(&HostEvent::new(EventKind::Join, alex));
//! assert_eq!(session.host().messages(alex), ["Welcome, alex!"]);
//! ```

use blockscript_lang::{ActorId, Script, ValidationError};
use crossbeam_channel::{Receiver, Sender};
use hashbrown::{HashMap, HashSet};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::dispatcher::{Dispatcher, Handler, HostEvent, actor_role};
use crate::error::ScriptError;
use crate::host::{Host, NoSideEffects, SideEffects};
use crate::interpreter::Interpreter;
use crate::result::ExecutionResult;
use crate::scheduler::{LoopPoll, LoopRegistry, TickScheduler};
use crate::store::{ScriptStore, StoreError};

/// Session error type.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid script: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no script for {0}")]
    UnknownScript(ActorId),

    #[error("script of {owner} has no line {line}")]
    UnknownLine { owner: ActorId, line: usize },
}

pub type SessionResult<T> = Result<T, SessionError>;

pub struct Session<H: Host> {
    config: EngineConfig,
    host: H,
    effects: Box<dyn SideEffects>,
    store: Box<dyn ScriptStore>,
    scripts: HashMap<ActorId, Script>,
    /// Scripts changed since their last save.
    dirty: HashSet<ActorId>,
    dispatcher: Dispatcher,
    scheduler: TickScheduler,
    registry: LoopRegistry,
    inbox: Receiver<HostEvent>,
    outbox: Sender<HostEvent>,
    rng: StdRng,
}

impl<H: Host> Session<H> {
    /// Create a session. Side effects are rejected until a handler is installed with
    /// [`with_side_effects`](Self::with_side_effects).
    pub fn new(host: H, store: impl ScriptStore + 'static, config: EngineConfig) -> Self {
        let (outbox, inbox) = crossbeam_channel::unbounded();
        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            config,
            host,
            effects: Box::new(NoSideEffects),
            store: Box::new(store),
            scripts: HashMap::new(),
            dirty: HashSet::new(),
            dispatcher: Dispatcher::new(),
            scheduler: TickScheduler::new(),
            registry: LoopRegistry::new(),
            inbox,
            outbox,
            rng,
        }
    }

    #[must_use]
    pub fn with_side_effects(mut self, effects: impl SideEffects + 'static) -> Self {
        self.effects = Box::new(effects);
        self
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The active-loop table. Clones may be used from any thread to stop loops.
    pub const fn registry(&self) -> &LoopRegistry {
        &self.registry
    }

    pub const fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Queue for events raised on other threads. They are dispatched at the start of the next
    /// [`tick`](Self::tick).
    pub fn event_sender(&self) -> Sender<HostEvent> {
        self.outbox.clone()
    }

    /// Validate, register and take ownership of a script, replacing the owner's previous one.
    pub fn install_script(&mut self, mut script: Script) -> SessionResult<()> {
        script.validate()?;
        script.rebuild_functions();
        let owner = script.owner_id;
        self.dispatcher.register_script(&script);
        tracing::info!(
            "Installed script of {} ({}) with {} line(s)",
            script.owner_name,
            owner,
            script.lines.len()
        );
        self.scripts.insert(owner, script);
        self.dirty.insert(owner);
        Ok(())
    }

    pub fn script(&self, owner: ActorId) -> Option<&Script> {
        self.scripts.get(&owner)
    }

    /// Edit the owner's script, loading it from the store or creating an empty one first.
    ///
    /// The function table and event handlers are refreshed after the edit.
    pub fn script_mut<R>(
        &mut self,
        owner: ActorId,
        edit: impl FnOnce(&mut Script) -> R,
    ) -> SessionResult<R> {
        if !self.ensure_loaded(owner)? {
            let name = self
                .host
                .actor(owner)
                .map_or_else(|| owner.to_string(), |actor| actor.name);
            tracing::info!("Created script for {name}");
            self.scripts.insert(owner, Script::new(owner, name));
        }
        let Some(script) = self.scripts.get_mut(&owner) else {
            return Err(SessionError::UnknownScript(owner));
        };

        let result = edit(script);
        script.rebuild_functions();
        script.touch();
        self.dispatcher.register_script(script);
        self.dirty.insert(owner);
        Ok(result)
    }

    pub fn set_line_enabled(
        &mut self,
        owner: ActorId,
        line: usize,
        enabled: bool,
    ) -> SessionResult<()> {
        let script = self
            .scripts
            .get_mut(&owner)
            .ok_or(SessionError::UnknownScript(owner))?;
        let target = script
            .lines
            .get_mut(line)
            .ok_or(SessionError::UnknownLine { owner, line })?;
        target.enabled = enabled;
        script.touch();
        self.dirty.insert(owner);
        Ok(())
    }

    /// Stop the actor's asynchronous loop. It ends at its next scheduled iteration.
    pub fn stop_loop(&self, actor: ActorId) -> bool {
        self.registry.request_stop(actor)
    }

    /// Route a host event to the acting actor's lines.
    ///
    /// Called off the tick thread, the event is queued for the next tick instead.
    pub fn dispatch(&mut self, event: &HostEvent) {
        if !self.host.is_tick_thread() {
            tracing::debug!("Queued {} event for {} from another thread", event.kind, event.actor);
            // The receiver lives as long as the session.
            let _ = self.outbox.send(event.clone());
            return;
        }
        self.dispatch_now(event);
    }

    fn dispatch_now(&mut self, event: &HostEvent) {
        if let Err(e) = self.ensure_loaded(event.actor) {
            tracing::error!("Could not load script of {}: {}", event.actor, e);
            return;
        }
        let handlers: Vec<Handler> = self.dispatcher.matching(event).collect();
        if handlers.is_empty() {
            tracing::trace!("No handlers for {} of {}", event.kind, event.actor);
            return;
        }
        for handler in handlers {
            self.run_handler(handler, event);
        }
    }

    fn run_handler(&mut self, handler: Handler, event: &HostEvent) {
        let Some(script) = self.scripts.get(&handler.owner) else {
            return;
        };
        let Some(line) = script.lines.get(handler.line) else {
            return;
        };
        if !script.enabled || !line.enabled {
            return;
        }
        if let Some(world) = &script.bound_world {
            let here = self.host.actor(event.actor).map(|actor| actor.location.world);
            if here.as_deref() != Some(world.as_str()) {
                tracing::debug!("Line '{}' is bound to world {}", line.name, world);
                return;
            }
        }

        let mut ctx = ExecutionContext::new(event.actor, script, self.config.max_log_entries);
        bind_roles(&mut ctx, event, &self.host, &mut self.rng);

        let mut interp = Interpreter::new(
            &mut self.host,
            self.effects.as_mut(),
            &mut self.scheduler,
            &self.registry,
            &self.config,
            &mut self.rng,
        );
        let result = interp.run_line(line, &mut ctx);
        tracing::debug!(
            "Line '{}' of {} ran {} block(s): {}",
            line.name,
            handler.owner,
            ctx.log().len() + ctx.dropped_log_entries(),
            result.label()
        );

        if let Some(script) = self.scripts.get_mut(&handler.owner) {
            ctx.commit(&mut script.globals);
            self.dirty.insert(handler.owner);
        }
        if let ExecutionResult::Error(e) = result {
            report(&mut self.host, event.actor, ctx.line(), &e);
        }
    }

    /// Advance one tick: queued events, then due delays, then one iteration of every due loop.
    ///
    /// Variables are committed to the owning script after every unit of work.
    pub fn tick(&mut self) -> u64 {
        let queued: Vec<HostEvent> = self.inbox.try_iter().collect();
        for event in &queued {
            self.dispatch_now(event);
        }
        let tick = self.scheduler.advance();

        let Self {
            config,
            host,
            effects,
            scripts,
            dirty,
            scheduler,
            registry,
            rng,
            ..
        } = self;

        scheduler.poll_deferred(|scheduler, mut task| {
            let owner = task.actor();
            if let Some(script) = scripts.get(&owner) {
                task.context.refresh(&script.globals);
            }
            let mut interp = Interpreter::new(
                &mut *host,
                effects.as_mut(),
                scheduler,
                registry,
                config,
                &mut *rng,
            );
            let result = task.run(&mut interp);

            if let Some(script) = scripts.get_mut(&owner) {
                task.context.commit(&mut script.globals);
                dirty.insert(owner);
            }
            if let ExecutionResult::Error(e) = result {
                report(&mut *host, owner, task.context.line(), &e);
            }
        });

        scheduler.poll_loops(|scheduler, task| {
            let owner = task.actor();
            if let Some(script) = scripts.get(&owner) {
                task.context_mut().refresh(&script.globals);
            }
            let mut interp = Interpreter::new(
                &mut *host,
                effects.as_mut(),
                scheduler,
                registry,
                config,
                &mut *rng,
            );
            let poll = task.poll_once(&mut interp);

            if let Some(script) = scripts.get_mut(&owner) {
                task.context().commit(&mut script.globals);
                dirty.insert(owner);
            }
            if let LoopPoll::Finished(ExecutionResult::Error(e)) = &poll {
                report(&mut *host, owner, task.context().line(), e);
            }
            poll
        });
        tick
    }

    /// The actor left: stop their loop, drop pending work and handlers, save and unload the
    /// script.
    pub fn actor_departed(&mut self, actor: ActorId) -> SessionResult<()> {
        self.registry.request_stop(actor);
        self.scheduler.cancel_actor(actor);
        self.dispatcher.unregister(actor);
        self.dirty.remove(&actor);
        if let Some(script) = self.scripts.remove(&actor) {
            self.store.save(&script)?;
            tracing::info!("Saved and unloaded script of {}", script.owner_name);
        }
        Ok(())
    }

    /// Save every changed script. Failed saves stay pending; the first failure is returned.
    pub fn flush_all(&mut self) -> SessionResult<usize> {
        let mut saved = 0;
        let mut failure = None;
        for owner in self.dirty.drain().collect::<Vec<_>>() {
            let Some(script) = self.scripts.get(&owner) else {
                continue;
            };
            match self.store.save(script) {
                Ok(()) => saved += 1,
                Err(e) => {
                    tracing::error!("Could not save script of {owner}: {e}");
                    self.dirty.insert(owner);
                    failure.get_or_insert(e);
                }
            }
        }
        tracing::info!("Flushed {saved} script(s)");
        failure.map_or(Ok(saved), |e| Err(e.into()))
    }

    /// Make sure the owner's script is in memory. Returns whether one exists.
    fn ensure_loaded(&mut self, owner: ActorId) -> SessionResult<bool> {
        if self.scripts.contains_key(&owner) {
            return Ok(true);
        }
        let Some(mut script) = self.store.load(owner)? else {
            return Ok(false);
        };
        script.rebuild_functions();
        self.dispatcher.register_script(&script);
        tracing::info!("Loaded script of {} from the store", script.owner_name);
        self.scripts.insert(owner, script);
        Ok(true)
    }
}

/// Expose the event's participants and payload as `%role%` placeholders.
fn bind_roles(ctx: &mut ExecutionContext, event: &HostEvent, host: &dyn Host, rng: &mut StdRng) {
    let name_of = |id| host.actor(id).map(|actor| actor.name);

    if let Some(name) = name_of(event.actor) {
        if let Some(role) = actor_role(event.kind) {
            ctx.set_role(role, name.clone());
        }
        ctx.set_role("player", name);
    }
    for (role, id) in &event.roles {
        if let Some(name) = name_of(*id) {
            ctx.set_role(role.clone(), name);
        }
    }
    if let Some(random) = host.online_actors().choose(rng) {
        ctx.set_role("random", random.name.clone());
    }
    for (key, value) in &event.data {
        ctx.set_role(format!("event_{key}"), value.clone());
    }
}

fn report(host: &mut dyn Host, actor: ActorId, line: &str, error: &ScriptError) {
    tracing::error!("Line '{}' of {} failed: {}", line, actor, error);
    host.send_message(actor, &format!("[BlockScript] Error in line '{line}': {error}"));
}
