//! Predicate evaluation for `IF` blocks and conditional loops.

use std::cmp::Ordering;

use blockscript_lang::{Condition, ConditionKind, Value};
use rand::Rng;

use crate::context::{ExecutionContext, Target};
use crate::error::{ScriptError, ScriptResult};
use crate::host::Host;
use crate::resolve::Resolver;
use crate::value::RuntimeValue;

/// Evaluate `condition`, applying its inversion marker.
pub fn evaluate(
    condition: &Condition,
    ctx: &ExecutionContext,
    host: &dyn Host,
    rng: &mut impl Rng,
) -> ScriptResult<bool> {
    let check = condition
        .check
        .ok_or_else(|| ScriptError::parse("condition has no check"))?;
    let resolver = Resolver::new(ctx, host);
    let left = || resolver.require(condition.left.as_ref(), "left operand");
    let right = || resolver.require(condition.right.as_ref(), "right operand");

    let passed = match check {
        ConditionKind::Equals => left()?.equals(&right()?),
        ConditionKind::NotEquals => !left()?.equals(&right()?),
        ConditionKind::GreaterThan => compare(&left()?, &right()?) == Ordering::Greater,
        ConditionKind::GreaterOrEqual => compare(&left()?, &right()?) != Ordering::Less,
        ConditionKind::LessThan => compare(&left()?, &right()?) == Ordering::Less,
        ConditionKind::LessOrEqual => compare(&left()?, &right()?) != Ordering::Greater,
        ConditionKind::Contains => {
            let (haystack, needle) = (resolver.display(&left()?), resolver.display(&right()?));
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
        ConditionKind::StartsWith => {
            let (text, prefix) = (resolver.display(&left()?), resolver.display(&right()?));
            text.to_lowercase().starts_with(&prefix.to_lowercase())
        }
        ConditionKind::VariableExists => {
            let raw = match condition.left.as_ref() {
                Some(Value::Variable { name }) => name.clone(),
                Some(other) => other.raw().into_owned(),
                None => return Err(ScriptError::parse("missing variable name")),
            };
            ctx.contains(&resolver.variable_name(&raw))
        }
        ConditionKind::TargetExists => target_exists(ctx.target(), host),
        ConditionKind::TargetInWorld => {
            let world = resolver.display(&left()?);
            let actors = target_actors(ctx, host)?;
            actors
                .iter()
                .all(|actor| actor.location.world.eq_ignore_ascii_case(&world))
        }
        ConditionKind::HealthAbove => {
            let threshold = resolver.number(condition.left.as_ref(), "health threshold")?;
            let actors = target_actors(ctx, host)?;
            actors.iter().all(|actor| actor.health > threshold)
        }
        ConditionKind::Chance => {
            let percent = resolver.number(condition.left.as_ref(), "chance")?;
            rng.random_range(0.0..100.0) < percent
        }
    };
    Ok(passed != condition.invert)
}

/// Numeric comparison when both sides are numbers, text comparison otherwise.
fn compare(left: &RuntimeValue, right: &RuntimeValue) -> Ordering {
    match (left.try_number(), right.try_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => left
            .as_text()
            .to_lowercase()
            .cmp(&right.as_text().to_lowercase()),
    }
}

fn target_exists(target: &Target, host: &dyn Host) -> bool {
    match target {
        Target::None => false,
        Target::Actor(id) => host.actor(*id).is_some(),
        Target::Actors(ids) => !ids.is_empty(),
        Target::Entity(id) => host.entity(*id).is_some(),
        Target::Entities(ids) => !ids.is_empty(),
        Target::Value(value) => !value.is_none(),
    }
}

/// Online actors of the current target; an error when there are none.
fn target_actors(
    ctx: &ExecutionContext,
    host: &dyn Host,
) -> ScriptResult<Vec<crate::host::ActorInfo>> {
    let actors: Vec<_> = ctx
        .target()
        .actors()
        .into_iter()
        .filter_map(|id| host.actor(id))
        .collect();
    if actors.is_empty() {
        return Err(ScriptError::reference("condition needs an actor target"));
    }
    Ok(actors)
}
