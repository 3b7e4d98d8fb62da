//! Tick-paced execution of asynchronous loops and delayed blocks.
//!
//! # Tick Execution Model
//!
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Phase 1: Drain events queued from background threads       │
//! │  Phase 2: Run DELAY bodies that became due                  │
//! │  Phase 3: Poll due loops, one iteration each                │
//! │  Phase 4: Commit variables after every unit of work         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A loop never runs more than one iteration per tick. The host decides how often ticks happen.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blockscript_lang::{ActorId, Block};
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::context::ExecutionContext;
use crate::error::{ScriptError, ScriptResult};
use crate::interpreter::{Interpreter, LoopCursor, Step};
use crate::result::ExecutionResult;

/// Unique identifier for a started loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(u32);

impl LoopId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Cancellation handle of a running loop.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    id: LoopId,
    cancel: Arc<AtomicBool>,
}

impl LoopHandle {
    #[must_use]
    pub const fn id(&self) -> LoopId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }
}

#[derive(Default)]
struct LoopRegistryInner {
    active: HashMap<ActorId, LoopHandle>,
    next_id: u32,
}

/// At most one asynchronous loop per actor.
///
/// The only engine state that may be touched from outside the tick thread: stop requests can
/// come from anywhere. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct LoopRegistry {
    inner: Arc<RwLock<LoopRegistryInner>>,
}

impl LoopRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the actor's loop slot. Fails without touching the running loop if it is taken.
    pub fn try_register(&self, actor: ActorId) -> ScriptResult<LoopHandle> {
        let mut inner = self.inner.write();
        if inner.active.contains_key(&actor) {
            return Err(ScriptError::state("loop already running for this actor"));
        }
        let handle = LoopHandle {
            id: LoopId(inner.next_id),
            cancel: Arc::new(AtomicBool::new(false)),
        };
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.active.insert(actor, handle.clone());
        Ok(handle)
    }

    /// Stop the actor's loop. It notices at its next scheduled iteration.
    ///
    /// Returns `false` if no loop was running.
    pub fn request_stop(&self, actor: ActorId) -> bool {
        let Some(handle) = self.inner.write().active.remove(&actor) else {
            return false;
        };
        handle.cancel();
        tracing::info!("Stop requested for loop {} of {}", handle.id.0, actor);
        true
    }

    /// Free the slot if it still belongs to `id`.
    pub fn release(&self, actor: ActorId, id: LoopId) {
        let mut inner = self.inner.write();
        if inner.active.get(&actor).is_some_and(|handle| handle.id == id) {
            inner.active.remove(&actor);
        }
    }

    #[must_use]
    pub fn is_running(&self, actor: ActorId) -> bool {
        self.inner.read().active.contains_key(&actor)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().active.is_empty()
    }
}

/// Outcome of polling a loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopPoll {
    /// Another iteration is scheduled.
    Pending,
    /// The loop is over; its slot has been released.
    Finished(ExecutionResult),
}

/// An asynchronous `REPEAT`, run one iteration per poll.
#[derive(Debug)]
pub struct LoopTask {
    actor: ActorId,
    handle: LoopHandle,
    body: Vec<Block>,
    cursor: LoopCursor,
    context: ExecutionContext,
    interval: u32,
    next_tick: u64,
}

impl LoopTask {
    /// Build a task whose first iteration runs on the tick after `now`.
    pub fn start(
        handle: LoopHandle,
        body: Vec<Block>,
        cursor: LoopCursor,
        mut context: ExecutionContext,
        interval: u32,
        now: u64,
    ) -> Self {
        context.set_cancel_flag(handle.flag());
        Self {
            actor: context.actor(),
            handle,
            body,
            cursor,
            context,
            interval: interval.max(1),
            next_tick: now + 1,
        }
    }

    /// Run at most one iteration.
    ///
    /// Checks the stop flag and the actor's presence before the body, never during it.
    pub fn poll_once(&mut self, interp: &mut Interpreter<'_>) -> LoopPoll {
        if self.handle.is_cancelled() {
            tracing::debug!("Loop {} of {} cancelled", self.handle.id.0, self.actor);
            return self.finish(interp, ExecutionResult::Success);
        }
        if interp.host.actor(self.actor).is_none() {
            tracing::info!("Actor {} unavailable, stopping loop {}", self.actor, self.handle.id.0);
            return self.finish(interp, ExecutionResult::Success);
        }

        let result = match interp.iterate(&mut self.cursor, &self.body, &mut self.context) {
            Step::Next => {
                self.next_tick = interp.scheduler.now() + u64::from(self.interval);
                return LoopPoll::Pending;
            }
            Step::Done(
                ExecutionResult::Break | ExecutionResult::Continue | ExecutionResult::Return(_),
            ) => ExecutionResult::Success,
            Step::Done(result) => result,
        };
        self.finish(interp, result)
    }

    /// Ask the loop to stop at its next poll.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    fn finish(&self, interp: &Interpreter<'_>, result: ExecutionResult) -> LoopPoll {
        interp.registry.release(self.actor, self.handle.id);
        tracing::info!(
            "Loop {} of {} finished after {} iteration(s): {}",
            self.handle.id.0,
            self.actor,
            self.cursor.iterations(),
            result.label()
        );
        LoopPoll::Finished(result)
    }

    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    #[must_use]
    pub const fn id(&self) -> LoopId {
        self.handle.id
    }

    #[must_use]
    pub const fn next_tick(&self) -> u64 {
        self.next_tick
    }

    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }
}

/// Children of a `DELAY` block waiting for their tick.
#[derive(Debug)]
pub struct DeferredTask {
    pub(crate) due: u64,
    pub(crate) body: Vec<Block>,
    pub(crate) context: ExecutionContext,
}

impl DeferredTask {
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.context.actor()
    }

    #[must_use]
    pub const fn due(&self) -> u64 {
        self.due
    }

    /// Run the delayed blocks. Control-flow signals end here like at the top of a line.
    pub fn run(&mut self, interp: &mut Interpreter<'_>) -> ExecutionResult {
        match interp.execute_children(&self.body, &mut self.context) {
            ExecutionResult::Error(e) => ExecutionResult::Error(e),
            _ => ExecutionResult::Success,
        }
    }

    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

/// Owns the tick counter and all pending asynchronous work.
#[derive(Debug, Default)]
pub struct TickScheduler {
    tick: u64,
    loops: Vec<LoopTask>,
    deferred: Vec<DeferredTask>,
}

impl TickScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.tick
    }

    /// Move to the next tick.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn start_loop(&mut self, task: LoopTask) {
        tracing::info!("Loop {} started for {}", task.handle.id.0, task.actor);
        self.loops.push(task);
    }

    pub fn schedule_delay(&mut self, task: DeferredTask) {
        self.deferred.push(task);
    }

    /// Poll every loop that is due this tick. `drive` runs one iteration and may start new
    /// work on the scheduler it is handed; loops started during this call wait for a later
    /// tick.
    ///
    /// Returns how many loops finished.
    pub fn poll_loops<F>(&mut self, mut drive: F) -> usize
    where
        F: FnMut(&mut Self, &mut LoopTask) -> LoopPoll,
    {
        let tick = self.tick;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.loops)
            .into_iter()
            .partition(|task| task.next_tick <= tick);
        self.loops = waiting;

        let mut finished = 0;
        for mut task in due {
            match drive(self, &mut task) {
                LoopPoll::Pending => self.loops.push(task),
                LoopPoll::Finished(_) => finished += 1,
            }
        }
        finished
    }

    /// Hand every due delayed task to `run`.
    pub fn poll_deferred<F>(&mut self, mut run: F) -> usize
    where
        F: FnMut(&mut Self, DeferredTask),
    {
        let tick = self.tick;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|task| task.due <= tick);
        self.deferred = waiting;

        let count = due.len();
        for task in due {
            run(self, task);
        }
        count
    }

    /// Cancel the actor's loops and drop their pending delays.
    pub fn cancel_actor(&mut self, actor: ActorId) {
        for task in self.loops.iter().filter(|task| task.actor == actor) {
            task.cancel();
        }
        self.deferred.retain(|task| task.actor() != actor);
    }

    #[must_use]
    pub fn active_loops(&self) -> usize {
        self.loops.len()
    }

    #[must_use]
    pub fn pending_delays(&self) -> usize {
        self.deferred.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_loop_rejected_without_cancelling_first() {
        let registry = LoopRegistry::new();
        let actor = ActorId::new();

        let first = registry.try_register(actor).unwrap();
        let err = registry.try_register(actor).unwrap_err();
        assert_eq!(err, ScriptError::state("loop already running for this actor"));
        assert!(!first.is_cancelled());
        assert!(registry.is_running(actor));
    }

    #[test]
    fn test_stale_release_keeps_new_loop() {
        let registry = LoopRegistry::new();
        let actor = ActorId::new();

        let old = registry.try_register(actor).unwrap();
        assert!(registry.request_stop(actor));
        assert!(old.is_cancelled());

        let new = registry.try_register(actor).unwrap();
        registry.release(actor, old.id());
        assert!(registry.is_running(actor));
        registry.release(actor, new.id());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stop_from_another_thread() {
        let registry = LoopRegistry::new();
        let actor = ActorId::new();
        let handle = registry.try_register(actor).unwrap();

        let remote = registry.clone();
        std::thread::spawn(move || remote.request_stop(actor))
            .join()
            .unwrap();

        assert!(handle.is_cancelled());
        assert!(!registry.is_running(actor));
    }
}
