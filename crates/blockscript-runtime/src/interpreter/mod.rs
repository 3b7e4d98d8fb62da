//! Tree-walking execution of blocks.
//!
//! Every block produces an [`ExecutionResult`]. Sibling walks stop at the first non-`Success`
//! result and hand it upwards: loops absorb `Break`/`Continue`, function calls absorb
//! `Return`, and nothing absorbs `Error` before the top of the line.

mod actions;
mod functions;
mod loops;
mod targets;

use blockscript_lang::{Block, BlockKind, Line};
use rand::rngs::StdRng;

use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::host::{Host, SideEffects};
use crate::ops::condition;
use crate::result::ExecutionResult;
use crate::scheduler::{LoopRegistry, TickScheduler};

pub use loops::LoopCursor;
pub(crate) use loops::Step;

/// Everything a block may touch while it runs, borrowed from the session for one unit of work.
pub struct Interpreter<'a> {
    pub(crate) host: &'a mut dyn Host,
    pub(crate) effects: &'a mut dyn SideEffects,
    pub(crate) scheduler: &'a mut TickScheduler,
    pub(crate) registry: &'a LoopRegistry,
    pub(crate) config: &'a EngineConfig,
    pub(crate) rng: &'a mut StdRng,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        host: &'a mut dyn Host,
        effects: &'a mut dyn SideEffects,
        scheduler: &'a mut TickScheduler,
        registry: &'a LoopRegistry,
        config: &'a EngineConfig,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            host,
            effects,
            scheduler,
            registry,
            config,
            rng,
        }
    }

    /// Execute one block on its own.
    ///
    /// An `ELSE` executed this way has no preceding `IF` and does nothing.
    pub fn execute(&mut self, block: &Block, ctx: &mut ExecutionContext) -> ExecutionResult {
        self.run(block, ctx, None).0
    }

    /// Execute siblings in order. An empty list is `Success`.
    pub fn execute_children(
        &mut self,
        blocks: &[Block],
        ctx: &mut ExecutionContext,
    ) -> ExecutionResult {
        let mut previous_if = None;
        for block in blocks {
            let (result, taken) = self.run(block, ctx, previous_if);
            if !result.is_success() {
                return result;
            }
            previous_if = taken;
        }
        ExecutionResult::Success
    }

    /// Run the body of a line. Disabled lines do nothing.
    ///
    /// Loop and function signals that reach the top of the line end it successfully.
    pub fn run_line(&mut self, line: &Line, ctx: &mut ExecutionContext) -> ExecutionResult {
        if !line.enabled {
            tracing::debug!("Line '{}' is disabled", line.name);
            return ExecutionResult::Success;
        }
        ctx.set_line(&line.name);

        match self.execute_children(line.body(), ctx) {
            result @ (ExecutionResult::Break | ExecutionResult::Continue) => {
                tracing::debug!("{} outside of a loop ends line '{}'", result.label(), line.name);
                ExecutionResult::Success
            }
            ExecutionResult::Return(_) => ExecutionResult::Success,
            result => result,
        }
    }

    /// Dispatch on the block variant. The second value is whether an `IF` took its branch.
    fn run(
        &mut self,
        block: &Block,
        ctx: &mut ExecutionContext,
        previous_if: Option<bool>,
    ) -> (ExecutionResult, Option<bool>) {
        let children = block.children();
        let mut taken = None;

        let result = match block.kind() {
            BlockKind::Event(_) | BlockKind::Function(_) => ExecutionResult::Success,
            BlockKind::If(predicate) => {
                match condition::evaluate(predicate, ctx, &*self.host, &mut *self.rng) {
                    Ok(true) => {
                        taken = Some(true);
                        self.execute_children(children, ctx)
                    }
                    Ok(false) => {
                        taken = Some(false);
                        ExecutionResult::Success
                    }
                    Err(e) => e.into(),
                }
            }
            BlockKind::Else if previous_if == Some(false) => self.execute_children(children, ctx),
            BlockKind::Else => ExecutionResult::Success,
            BlockKind::Repeat(params) => self.repeat(params, children, ctx),
            BlockKind::Target(params) => self.target(params, children, ctx),
            BlockKind::CallFunction(params) => self.call(params, ctx),
            BlockKind::Variable(params) => self.variable(params, ctx).into(),
            BlockKind::Math(params) => self.math(params, ctx).into(),
            BlockKind::Text(params) => self.text(params, ctx).into(),
            BlockKind::Message(params) => self.message(params, ctx).into(),
            BlockKind::Teleport(params) => self.teleport(params, ctx).into(),
            BlockKind::SideEffect(params) => self.side_effect(params, ctx).into(),
            BlockKind::Delay(params) => self.delay(params, children, ctx),
            BlockKind::StopLoop => {
                if !self.registry.request_stop(ctx.actor()) {
                    tracing::debug!("No loop to stop for {}", ctx.actor());
                }
                ExecutionResult::Success
            }
            BlockKind::Break => ExecutionResult::Break,
            BlockKind::Continue => ExecutionResult::Continue,
            BlockKind::Return(params) => self.return_value(params, ctx),
        };

        tracing::debug!(block = %block.id(), "{} -> {}", block.block_type(), result.label());
        if let ExecutionResult::Error(e) = &result {
            tracing::debug!(block = %block.id(), "{}", e);
        }
        ctx.record(block, &result);
        (result, taken)
    }
}

#[cfg(test)]
mod tests;
