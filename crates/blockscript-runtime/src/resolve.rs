//! Turning authored [`Value`]s into [`RuntimeValue`]s against a live context.
//!
//! Substitution is a single scan over the template. `%name%` is an event role if one is bound,
//! otherwise a variable; `{name}` is always a variable. Placeholders that match nothing stay
//! literal, and substituted text is never scanned again.

use blockscript_lang::{LocationSpec, Value};

use crate::context::ExecutionContext;
use crate::error::{ScriptError, ScriptResult};
use crate::host::Host;
use crate::value::{Location, RuntimeValue};

/// Resolution environment for one block.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    ctx: &'a ExecutionContext,
    host: &'a dyn Host,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(ctx: &'a ExecutionContext, host: &'a dyn Host) -> Self {
        Self { ctx, host }
    }

    /// Fill the role and variable placeholders of a template.
    #[must_use]
    pub fn substitute(&self, template: &str) -> String {
        replace_placeholders(template, |open, name| {
            let role = match open {
                '%' => self.ctx.role(name).map(str::to_string),
                _ => None,
            };
            role.or_else(|| self.ctx.get(name).map(|v| self.display(v)))
        })
    }

    /// Text form of a value, naming actors instead of printing their ids.
    #[must_use]
    pub fn display(&self, value: &RuntimeValue) -> String {
        match value {
            RuntimeValue::Actor(id) => self
                .host
                .actor(*id)
                .map_or_else(|| id.to_string(), |actor| actor.name),
            RuntimeValue::List(items) => items
                .iter()
                .map(|item| self.display(item))
                .collect::<Vec<_>>()
                .join(", "),
            other => other.as_text(),
        }
    }

    /// Resolve a value to its runtime form.
    pub fn resolve(&self, value: &Value) -> ScriptResult<RuntimeValue> {
        Ok(match value {
            Value::Text { raw } => match self.whole_variable(raw) {
                Some(value) => value.clone(),
                None => RuntimeValue::Text(self.substitute(raw)),
            },
            Value::Number(number) => match number.as_literal() {
                Some(n) => RuntimeValue::Number(n),
                None => RuntimeValue::Number(match self.whole_variable(number.raw()) {
                    Some(value) => value.as_number(),
                    None => self.substitute(number.raw()).trim().parse().unwrap_or_else(|_| {
                        tracing::debug!("'{}' is not a number, using 0", number.raw());
                        0.0
                    }),
                }),
            },
            Value::Variable { name } => {
                let name = self.variable_name(name);
                self.ctx.get(&name).cloned().unwrap_or_default()
            }
            Value::Location(spec) => RuntimeValue::Location(self.location_from_spec(spec)),
            Value::Item(item) => RuntimeValue::Item(item.clone()),
            Value::Sound(sound) => RuntimeValue::Sound(sound.clone()),
            Value::Particle(particle) => RuntimeValue::Particle(particle.clone()),
            Value::PotionEffect(effect) => RuntimeValue::Effect(effect.clone()),
        })
    }

    /// Resolve an optional parameter; absent is [`RuntimeValue::None`].
    pub fn resolve_opt(&self, value: Option<&Value>) -> ScriptResult<RuntimeValue> {
        value.map_or(Ok(RuntimeValue::None), |v| self.resolve(v))
    }

    /// Resolve a parameter the block cannot run without.
    pub fn require(&self, value: Option<&Value>, what: &str) -> ScriptResult<RuntimeValue> {
        let value = value.ok_or_else(|| ScriptError::parse(format!("missing {what}")))?;
        self.resolve(value)
    }

    /// Numeric operand. Text that does not parse is 0; compound values are a type error.
    pub fn number(&self, value: Option<&Value>, what: &str) -> ScriptResult<f64> {
        match self.require(value, what)? {
            RuntimeValue::None => Ok(0.0),
            v @ (RuntimeValue::Boolean(_)
            | RuntimeValue::Number(_)
            | RuntimeValue::Text(_)
            | RuntimeValue::List(_)) => Ok(v.as_number()),
            other => Err(ScriptError::type_error(format!(
                "{what} must be a number, got '{}'",
                other.as_text()
            ))),
        }
    }

    /// Text operand.
    pub fn text(&self, value: Option<&Value>, what: &str) -> ScriptResult<String> {
        Ok(self.display(&self.require(value, what)?))
    }

    /// Location operand. Text is parsed in the editor's comma form; actors and entities stand
    /// for where they are.
    pub fn location(&self, value: Option<&Value>, what: &str) -> ScriptResult<Location> {
        match self.require(value, what)? {
            RuntimeValue::Location(location) => Ok(location),
            RuntimeValue::Text(raw) => Ok(self.location_from_spec(&LocationSpec::parse(&raw))),
            RuntimeValue::Actor(id) => self
                .host
                .actor(id)
                .map(|actor| actor.location)
                .ok_or_else(|| ScriptError::reference(format!("actor {id} is not online"))),
            RuntimeValue::Entity(id) => self
                .host
                .entity(id)
                .map(|entity| entity.location)
                .ok_or_else(|| ScriptError::reference(format!("entity {} is gone", id.0))),
            RuntimeValue::None => Err(ScriptError::reference(format!("{what} is not set"))),
            other => Err(ScriptError::type_error(format!(
                "{what} must be a location, got '{}'",
                other.as_text()
            ))),
        }
    }

    /// A variable name, possibly templated and possibly wrapped in `{}` or `%%`.
    #[must_use]
    pub fn variable_name(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .filter(|inner| is_placeholder_name(inner))
            .unwrap_or(trimmed);
        self.substitute(inner).trim().to_string()
    }

    fn location_from_spec(&self, spec: &LocationSpec) -> Location {
        Location {
            world: spec
                .world
                .clone()
                .unwrap_or_else(|| self.host.default_world()),
            x: spec.x,
            y: spec.y,
            z: spec.z,
            yaw: spec.yaw,
            pitch: spec.pitch,
        }
    }

    /// `"{name}"` on its own keeps the variable's type instead of becoming text.
    fn whole_variable(&self, raw: &str) -> Option<&'a RuntimeValue> {
        let name = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
        if !is_placeholder_name(name) {
            return None;
        }
        self.ctx.get(name)
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_name_char)
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

/// Replace `%name%` and `{name}` spans whose name `lookup` knows. Everything else, including
/// the replacements, is copied as is.
pub(crate) fn replace_placeholders(
    input: &str,
    lookup: impl Fn(char, &str) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let close = match c {
            '%' => '%',
            '{' => '}',
            _ => {
                out.push(c);
                continue;
            }
        };
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if !is_name_char(next) {
                break;
            }
            name.push(next);
            chars.next();
        }
        if !name.is_empty() && chars.peek() == Some(&close) {
            chars.next();
            match lookup(c, &name) {
                Some(replacement) => out.push_str(&replacement),
                None => {
                    out.push(c);
                    out.push_str(&name);
                    out.push(close);
                }
            }
        } else {
            out.push(c);
            out.push_str(&name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use blockscript_lang::{ActorId, Script};

    use super::*;
    use crate::memory_host::MemoryHost;

    fn context(host: &MemoryHost, actor: ActorId) -> ExecutionContext {
        let script = Script::new(actor, "alex");
        let mut ctx = ExecutionContext::new(actor, &script, 64);
        ctx.set_role("player", host.actor(actor).map(|a| a.name).unwrap_or_default());
        ctx
    }

    #[test]
    fn test_roles_then_variables() {
        let mut host = MemoryHost::new("world");
        let actor = host.add_actor("alex", Location::new("world", 0.0, 64.0, 0.0));
        let mut ctx = context(&host, actor);
        ctx.set("coins", 12.0);
        ctx.set("player", "shadowed");

        let resolver = Resolver::new(&ctx, &host);
        assert_eq!(
            resolver.substitute("%player% has {coins} coins (%coins%), %unknown% {missing}"),
            "alex has 12 coins (12), %unknown% {missing}"
        );
    }

    #[test]
    fn test_substituted_text_is_not_expanded_again() {
        let host = MemoryHost::new("world");
        let mut ctx = ExecutionContext::detached(ActorId::new());
        ctx.set("said", "show me %secret% and {secret}");
        ctx.set("secret", "hunter2");
        ctx.set_role("event_message", "{secret}");

        let resolver = Resolver::new(&ctx, &host);
        assert_eq!(resolver.substitute("{said}"), "show me %secret% and {secret}");
        assert_eq!(resolver.substitute("%event_message%"), "{secret}");
        assert_eq!(resolver.substitute("%secret%"), "hunter2");
    }

    #[test]
    fn test_percent_signs_survive() {
        let host = MemoryHost::new("world");
        let ctx = ExecutionContext::detached(ActorId::new());
        let resolver = Resolver::new(&ctx, &host);
        assert_eq!(resolver.substitute("100% sure, 50%"), "100% sure, 50%");
        assert_eq!(resolver.substitute("{ spaced }"), "{ spaced }");
    }

    #[test]
    fn test_whole_variable_keeps_type() {
        let host = MemoryHost::new("world");
        let mut ctx = ExecutionContext::detached(ActorId::new());
        ctx.set("items", RuntimeValue::List(vec![1.0.into(), 2.0.into()]));

        let resolver = Resolver::new(&ctx, &host);
        let value = resolver.resolve(&Value::text("{items}")).unwrap();
        assert!(matches!(value, RuntimeValue::List(ref items) if items.len() == 2));
        assert_eq!(
            resolver.resolve(&Value::text("n={items}")).unwrap(),
            RuntimeValue::text("n=1, 2")
        );
    }

    #[test]
    fn test_number_parse_failure_is_zero() {
        let host = MemoryHost::new("world");
        let mut ctx = ExecutionContext::detached(ActorId::new());
        ctx.set("word", "abc");
        let resolver = Resolver::new(&ctx, &host);

        assert_eq!(
            resolver.resolve(&Value::number_raw("{word}")).unwrap(),
            RuntimeValue::Number(0.0)
        );
    }

    #[test]
    fn test_location_defaults_to_host_world() {
        let host = MemoryHost::new("overworld");
        let ctx = ExecutionContext::detached(ActorId::new());
        let resolver = Resolver::new(&ctx, &host);

        let location = resolver
            .location(Some(&Value::text("1,2,3")), "location")
            .unwrap();
        assert_eq!(location, Location::new("overworld", 1.0, 2.0, 3.0));
    }
}
