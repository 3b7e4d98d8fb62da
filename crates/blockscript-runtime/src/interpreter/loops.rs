//! `REPEAT` blocks.

use blockscript_lang::{Block, Condition, LoopMode, RepeatParams};

use crate::context::ExecutionContext;
use crate::error::{ScriptError, ScriptResult};
use crate::ops::condition;
use crate::resolve::Resolver;
use crate::result::ExecutionResult;
use crate::scheduler::LoopTask;
use crate::value::RuntimeValue;

use super::Interpreter;

/// Outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    /// Run another iteration.
    Next,
    /// The loop is over with this result.
    Done(ExecutionResult),
}

/// Iteration state of a loop, with its count or list resolved when the loop starts.
#[derive(Debug, Clone)]
pub struct LoopCursor {
    mode: LoopMode,
    condition: Option<Condition>,
    items: Vec<RuntimeValue>,
    /// Iterations for `TIMES`, already capped.
    bound: u32,
    cap: u32,
    iteration: u32,
}

impl LoopCursor {
    /// Resolve the loop's operands against the context it starts in.
    pub fn new(
        params: &RepeatParams,
        ctx: &ExecutionContext,
        interp: &Interpreter<'_>,
    ) -> ScriptResult<Self> {
        let mode = params
            .mode
            .ok_or_else(|| ScriptError::parse("loop has no mode"))?;
        let cap = params.max_iterations.unwrap_or(interp.config.max_iterations);
        let resolver = Resolver::new(ctx, &*interp.host);

        let mut cursor = Self {
            mode,
            condition: None,
            items: Vec::new(),
            bound: 0,
            cap,
            iteration: 0,
        };
        match mode {
            LoopMode::Times => {
                let count = resolver.number(params.count.as_ref(), "loop count")?;
                let count = if count.is_nan() || count <= 0.0 { 0.0 } else { count.floor() };
                if count > f64::from(cap) {
                    tracing::warn!(
                        "Loop count {} exceeds the cap, running {} iterations",
                        count,
                        cap
                    );
                    cursor.bound = cap;
                } else {
                    cursor.bound = count as u32;
                }
            }
            LoopMode::ForEach => {
                let mut items = resolver.require(params.list.as_ref(), "loop list")?.into_list();
                if items.len() > cap as usize {
                    tracing::warn!(
                        "Loop list of {} items exceeds the cap, running {} iterations",
                        items.len(),
                        cap
                    );
                    items.truncate(cap as usize);
                }
                cursor.items = items;
            }
            LoopMode::While | LoopMode::Until => {
                let condition = params
                    .condition
                    .clone()
                    .ok_or_else(|| ScriptError::parse(format!("{mode} loop has no condition")))?;
                cursor.condition = Some(condition);
            }
            LoopMode::Forever => {}
        }
        Ok(cursor)
    }

    /// Iterations completed so far.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iteration
    }

    /// Decide whether the next iteration runs, and publish its loop variables.
    fn before(
        &self,
        interp: &mut Interpreter<'_>,
        ctx: &mut ExecutionContext,
    ) -> ScriptResult<bool> {
        match self.mode {
            LoopMode::Times if self.iteration >= self.bound => return Ok(false),
            LoopMode::ForEach => match self.items.get(self.iteration as usize) {
                Some(item) => ctx.set("_loop_value", item.clone()),
                None => return Ok(false),
            },
            LoopMode::While if !self.check(interp, ctx)? => return Ok(false),
            _ => {}
        }
        if self.mode.is_unbounded() && self.iteration >= self.cap {
            return Err(ScriptError::bounds(format!(
                "{} loop reached {} iterations",
                self.mode, self.cap
            )));
        }
        ctx.set("_loop_index", f64::from(self.iteration));
        ctx.set("_loop_count", f64::from(self.iteration) + 1.0);
        Ok(true)
    }

    /// Finish an iteration. `UNTIL` stops once its condition holds.
    fn after(
        &mut self,
        interp: &mut Interpreter<'_>,
        ctx: &ExecutionContext,
    ) -> ScriptResult<bool> {
        self.iteration += 1;
        if self.mode == LoopMode::Until && self.check(interp, ctx)? {
            return Ok(false);
        }
        Ok(true)
    }

    fn check(&self, interp: &mut Interpreter<'_>, ctx: &ExecutionContext) -> ScriptResult<bool> {
        let Some(predicate) = &self.condition else {
            return Ok(false);
        };
        condition::evaluate(predicate, ctx, &*interp.host, &mut *interp.rng)
    }
}

impl Interpreter<'_> {
    /// One iteration: loop check, body, advance.
    pub(crate) fn iterate(
        &mut self,
        cursor: &mut LoopCursor,
        body: &[Block],
        ctx: &mut ExecutionContext,
    ) -> Step {
        match cursor.before(self, ctx) {
            Ok(true) => {}
            Ok(false) => return Step::Done(ExecutionResult::Success),
            Err(e) => return Step::Done(e.into()),
        }
        match self.execute_children(body, ctx) {
            ExecutionResult::Success | ExecutionResult::Continue => {}
            ExecutionResult::Break => return Step::Done(ExecutionResult::Success),
            other => return Step::Done(other),
        }
        match cursor.after(self, ctx) {
            Ok(true) => Step::Next,
            Ok(false) => Step::Done(ExecutionResult::Success),
            Err(e) => Step::Done(e.into()),
        }
    }

    pub(super) fn repeat(
        &mut self,
        params: &RepeatParams,
        body: &[Block],
        ctx: &mut ExecutionContext,
    ) -> ExecutionResult {
        let mut cursor = match LoopCursor::new(params, ctx, self) {
            Ok(cursor) => cursor,
            Err(e) => return e.into(),
        };
        if params.asynchronous {
            return self.start_async(cursor, params.interval, body, ctx);
        }

        loop {
            if ctx.is_cancelled() {
                tracing::debug!("Loop cancelled after {} iteration(s)", cursor.iterations());
                return ExecutionResult::Success;
            }
            if let Step::Done(result) = self.iterate(&mut cursor, body, ctx) {
                return result;
            }
        }
    }

    /// Hand the loop to the scheduler. The line carries on immediately.
    fn start_async(
        &mut self,
        cursor: LoopCursor,
        interval: u32,
        body: &[Block],
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        let handle = match self.registry.try_register(ctx.actor()) {
            Ok(handle) => handle,
            Err(e) => return e.into(),
        };
        let task = LoopTask::start(
            handle,
            body.to_vec(),
            cursor,
            ctx.clone(),
            interval,
            self.scheduler.now(),
        );
        self.scheduler.start_loop(task);
        ExecutionResult::Success
    }
}
