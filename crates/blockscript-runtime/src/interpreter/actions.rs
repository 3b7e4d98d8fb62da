//! Blocks that compute values or act on the world.

use std::collections::BTreeMap;

use blockscript_lang::{
    Arity, Block, DelayParams, MathParams, MessageParams, SideEffectParams, TeleportParams,
    TextParams, Value, VariableOp, VariableParams,
};

use crate::context::ExecutionContext;
use crate::error::{ScriptError, ScriptResult};
use crate::ops::text::TextOperands;
use crate::ops::variable::{self, Update};
use crate::ops::{math, text};
use crate::resolve::Resolver;
use crate::result::ExecutionResult;
use crate::scheduler::DeferredTask;
use crate::value::RuntimeValue;

use super::Interpreter;

impl Interpreter<'_> {
    /// `VARIABLE`: compute the update against the current state, then apply it.
    pub(super) fn variable(
        &mut self,
        params: &VariableParams,
        ctx: &mut ExecutionContext,
    ) -> ScriptResult<()> {
        let op = params
            .op
            .ok_or_else(|| ScriptError::parse("variable block has no operation"))?;
        let resolver = Resolver::new(ctx, &*self.host);
        let name = resolver.variable_name(&params.name);
        if name.is_empty() {
            return Err(ScriptError::parse("variable name is empty"));
        }
        let value = || resolver.require(params.value.as_ref(), "value");

        let update = match op {
            VariableOp::Set => Update::Set(value()?),
            VariableOp::Add | VariableOp::Subtract | VariableOp::Multiply | VariableOp::Divide => {
                let operand = resolver.number(params.value.as_ref(), "value")?;
                variable::arithmetic(op, ctx.get(&name), operand)
            }
            VariableOp::Increment | VariableOp::Decrement => {
                variable::arithmetic(op, ctx.get(&name), 0.0)
            }
            VariableOp::Append => {
                let value = value()?;
                match ctx.get(&name) {
                    Some(RuntimeValue::List(items)) => {
                        let mut items = items.clone();
                        items.push(value);
                        Update::Set(RuntimeValue::List(items))
                    }
                    current => {
                        let mut joined = current.map(|v| resolver.display(v)).unwrap_or_default();
                        joined.push_str(&resolver.display(&value));
                        Update::Set(RuntimeValue::Text(joined))
                    }
                }
            }
            VariableOp::Clear => Update::Clear,
            VariableOp::Copy => {
                let source = params
                    .value
                    .as_ref()
                    .map(|v| resolver.variable_name(&v.raw()))
                    .ok_or_else(|| ScriptError::parse("missing source variable"))?;
                let copied = ctx.get(&source).cloned().ok_or_else(|| {
                    ScriptError::reference(format!("variable '{source}' is not set"))
                })?;
                Update::Set(copied)
            }
            VariableOp::RandomNumber => {
                let low = resolver.number(params.value.as_ref(), "lower bound")?;
                let high = resolver.number(params.extra.as_ref(), "upper bound")?;
                Update::Set(RuntimeValue::Number(variable::random_number(
                    low,
                    high,
                    &mut *self.rng,
                )?))
            }
            VariableOp::RandomChoice => {
                Update::Set(variable::random_choice(value()?, &mut *self.rng)?)
            }
            VariableOp::ToNumber => Update::Set(RuntimeValue::Number(
                ctx.get(&name).map_or(0.0, RuntimeValue::as_number),
            )),
            VariableOp::ToText => Update::Set(RuntimeValue::Text(
                ctx.get(&name).map(|v| resolver.display(v)).unwrap_or_default(),
            )),
            VariableOp::ActorInfo => {
                let key = resolver.text(params.value.as_ref(), "info key")?;
                let actors = self.target_actors(ctx, "actor info")?;
                Update::Set(variable::actor_info(&actors[0], &key)?)
            }
        };

        match update {
            Update::Set(value) => ctx.set(name, value),
            Update::Clear => ctx.clear(&name),
            Update::Keep => {}
        }
        Ok(())
    }

    /// `MATH`: the result variable is only written when the operation succeeds.
    pub(super) fn math(
        &mut self,
        params: &MathParams,
        ctx: &mut ExecutionContext,
    ) -> ScriptResult<()> {
        let op = params
            .op
            .ok_or_else(|| ScriptError::parse("math block has no operation"))?;
        let resolver = Resolver::new(ctx, &*self.host);
        let left = resolver.number(params.left.as_ref(), "left operand")?;
        let right = match op.arity() {
            Arity::Unary => 0.0,
            Arity::Binary => resolver.number(params.right.as_ref(), "right operand")?,
        };
        let result = resolver.variable_name(&params.result);
        if result.is_empty() {
            return Err(ScriptError::parse("math block has no result variable"));
        }

        let value = math::apply(op, left, right, self.config.magnitude_limit, &mut *self.rng)?;
        ctx.set(result, value);
        Ok(())
    }

    pub(super) fn text(
        &mut self,
        params: &TextParams,
        ctx: &mut ExecutionContext,
    ) -> ScriptResult<()> {
        let op = params
            .op
            .ok_or_else(|| ScriptError::parse("text block has no operation"))?;
        let resolver = Resolver::new(ctx, &*self.host);
        let optional = |value: Option<&Value>| -> ScriptResult<String> {
            Ok(resolver.display(&resolver.resolve_opt(value)?))
        };
        let operands = TextOperands {
            input: resolver.text(params.input.as_ref(), "input")?,
            argument: optional(params.argument.as_ref())?,
            replacement: optional(params.replacement.as_ref())?,
        };
        let result = resolver.variable_name(&params.result);
        if result.is_empty() {
            return Err(ScriptError::parse("text block has no result variable"));
        }

        ctx.set(result, text::apply(op, operands, self.config));
        Ok(())
    }

    pub(super) fn message(
        &mut self,
        params: &MessageParams,
        ctx: &ExecutionContext,
    ) -> ScriptResult<()> {
        let message = Resolver::new(ctx, &*self.host).text(params.text.as_ref(), "message text")?;
        for actor in self.target_actors(ctx, "message")? {
            self.host.send_message(actor.id, &message);
        }
        Ok(())
    }

    pub(super) fn teleport(
        &mut self,
        params: &TeleportParams,
        ctx: &ExecutionContext,
    ) -> ScriptResult<()> {
        let location =
            Resolver::new(ctx, &*self.host).location(params.location.as_ref(), "location")?;
        for actor in self.target_actors(ctx, "teleport")? {
            self.host.set_transform(actor.id, location.clone())?;
            tracing::debug!("Teleported {} to {}", actor.name, location);
        }
        Ok(())
    }

    pub(super) fn side_effect(
        &mut self,
        params: &SideEffectParams,
        ctx: &ExecutionContext,
    ) -> ScriptResult<()> {
        let kind = params.kind.trim();
        if kind.is_empty() {
            return Err(ScriptError::parse("side effect has no kind"));
        }
        let resolver = Resolver::new(ctx, &*self.host);
        let arguments = params
            .arguments
            .iter()
            .map(|(name, value)| resolver.resolve(value).map(|value| (name.clone(), value)))
            .collect::<ScriptResult<BTreeMap<_, _>>>()?;

        self.effects
            .perform(kind, &arguments, ctx)
            .map_err(|message| ScriptError::Effect {
                kind: kind.to_string(),
                message,
            })
    }

    /// `DELAY`: children run after the given number of ticks, or right away for zero.
    pub(super) fn delay(
        &mut self,
        params: &DelayParams,
        body: &[Block],
        ctx: &mut ExecutionContext,
    ) -> ExecutionResult {
        let ticks = match Resolver::new(ctx, &*self.host).number(params.ticks.as_ref(), "ticks") {
            Ok(ticks) => ticks,
            Err(e) => return e.into(),
        };
        if ticks.is_nan() || ticks < 1.0 {
            return self.execute_children(body, ctx);
        }

        let due = self.scheduler.now().saturating_add(ticks.floor() as u64);
        self.scheduler.schedule_delay(DeferredTask {
            due,
            body: body.to_vec(),
            context: ctx.clone(),
        });
        tracing::debug!("Deferred {} block(s) to tick {}", body.len(), due);
        ExecutionResult::Success
    }
}
