//! Pure parts of `VARIABLE` block operations.

use blockscript_lang::VariableOp;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::{ScriptError, ScriptResult};
use crate::host::ActorInfo;
use crate::value::RuntimeValue;

/// What to do with the target variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Set(RuntimeValue),
    Clear,
    Keep,
}

/// `ADD`/`SUBTRACT`/`MULTIPLY`/`DIVIDE`/`INCREMENT`/`DECREMENT` on the current value.
///
/// A missing or non-numeric current value counts as 0. Dividing by zero keeps the variable as
/// it was.
#[must_use]
pub fn arithmetic(op: VariableOp, current: Option<&RuntimeValue>, operand: f64) -> Update {
    let current = current.and_then(RuntimeValue::try_number).unwrap_or(0.0);
    let next = match op {
        VariableOp::Add => current + operand,
        VariableOp::Subtract => current - operand,
        VariableOp::Multiply => current * operand,
        VariableOp::Divide if operand == 0.0 => {
            tracing::debug!("variable divide by zero ignored");
            return Update::Keep;
        }
        VariableOp::Divide => current / operand,
        VariableOp::Increment => current + 1.0,
        VariableOp::Decrement => current - 1.0,
        _ => return Update::Keep,
    };
    Update::Set(RuntimeValue::Number(next))
}

/// Random number between the two bounds, inclusive. Whole bounds that fit in an `i64` give a
/// whole number.
pub fn random_number(a: f64, b: f64, rng: &mut impl Rng) -> ScriptResult<f64> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if !lo.is_finite() || !hi.is_finite() || !(hi - lo).is_finite() {
        return Err(ScriptError::arithmetic(format!(
            "cannot pick a random number between {a} and {b}"
        )));
    }
    let whole = lo.fract() == 0.0 && hi.fract() == 0.0;
    if whole && lo >= i64::MIN as f64 && hi < i64::MAX as f64 {
        return Ok(rng.random_range(lo as i64..=hi as i64) as f64);
    }
    if (hi - lo).abs() <= f64::EPSILON {
        return Ok(lo);
    }
    Ok(rng.random_range(lo..=hi))
}

/// Uniformly random element of a list value.
pub fn random_choice(list: RuntimeValue, rng: &mut impl Rng) -> ScriptResult<RuntimeValue> {
    let items = list.into_list();
    items
        .choose(rng)
        .cloned()
        .ok_or_else(|| ScriptError::reference("cannot choose from an empty list"))
}

/// `ACTOR_INFO` lookup by key.
pub fn actor_info(actor: &ActorInfo, key: &str) -> ScriptResult<RuntimeValue> {
    let location = &actor.location;
    Ok(match key.trim().to_ascii_lowercase().as_str() {
        "name" => RuntimeValue::text(actor.name.clone()),
        "health" => RuntimeValue::Number(actor.health),
        "food" | "hunger" => RuntimeValue::Number(f64::from(actor.food)),
        "level" => RuntimeValue::Number(f64::from(actor.level)),
        "x" => RuntimeValue::Number(location.x),
        "y" => RuntimeValue::Number(location.y),
        "z" => RuntimeValue::Number(location.z),
        "coordinates" | "location" => RuntimeValue::Location(location.clone()),
        "world" => RuntimeValue::text(location.world.clone()),
        other => {
            return Err(ScriptError::reference(format!("unknown actor info '{other}'")));
        }
    })
}
