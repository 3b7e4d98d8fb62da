//! `TARGET` blocks.

use std::cmp::Ordering;

use blockscript_lang::{Block, TargetKind, TargetParams, Value};
use rand::seq::IndexedRandom;

use crate::context::{ExecutionContext, Target};
use crate::error::{ScriptError, ScriptResult};
use crate::host::ActorInfo;
use crate::resolve::Resolver;
use crate::result::ExecutionResult;
use crate::value::RuntimeValue;

use super::Interpreter;

/// Search radius when a block does not set one.
const DEFAULT_RADIUS: f64 = 16.0;

impl Interpreter<'_> {
    /// Run `body` once with the resolved target as its subject, then restore the previous one.
    ///
    /// A target that resolves to nothing still runs the body, with no subject; blocks that need
    /// one fail.
    pub(super) fn target(
        &mut self,
        params: &TargetParams,
        body: &[Block],
        ctx: &mut ExecutionContext,
    ) -> ExecutionResult {
        let target = match self.resolve_target(params, ctx) {
            Ok(target) => target,
            Err(e) => return e.into(),
        };
        if target.is_none() {
            tracing::debug!("Target {:?} resolved to nothing", params.kind);
        }
        let previous = ctx.replace_target(target);
        let result = self.execute_children(body, ctx);
        ctx.replace_target(previous);
        result
    }

    pub(super) fn resolve_target(
        &mut self,
        params: &TargetParams,
        ctx: &ExecutionContext,
    ) -> ScriptResult<Target> {
        let kind = params
            .kind
            .ok_or_else(|| ScriptError::parse("target block has no kind"))?;
        let resolver = Resolver::new(ctx, &*self.host);
        let me = self.host.actor(ctx.actor());
        let radius = || -> ScriptResult<f64> {
            match params.radius {
                Some(_) => resolver.number(params.radius.as_ref(), "radius"),
                None => Ok(DEFAULT_RADIUS),
            }
        };

        Ok(match kind {
            TargetKind::CurrentActor => me.map_or(Target::None, |actor| Target::Actor(actor.id)),
            TargetKind::AllOnline => actor_group(self.host.online_actors()),
            TargetKind::SameWorld => match me {
                Some(me) => actor_group(
                    self.host
                        .online_actors()
                        .into_iter()
                        .filter(|actor| actor.location.world == me.location.world)
                        .collect(),
                ),
                None => Target::None,
            },
            TargetKind::NearestActor => {
                let Some(me) = me else {
                    return Ok(Target::None);
                };
                let radius = radius()?;
                self.host
                    .online_actors()
                    .into_iter()
                    .filter(|actor| actor.id != me.id)
                    .filter_map(|actor| {
                        let distance = me.location.distance_squared(&actor.location)?;
                        (distance <= radius * radius).then_some((distance, actor))
                    })
                    .min_by(|(a, x), (b, y)| by_distance(*a, *b).then_with(|| x.name.cmp(&y.name)))
                    .map_or(Target::None, |(_, actor)| Target::Actor(actor.id))
            }
            TargetKind::RandomActor => self
                .host
                .online_actors()
                .choose(&mut *self.rng)
                .map_or(Target::None, |actor| Target::Actor(actor.id)),
            TargetKind::NearestEntity => {
                let Some(center) = me.map(|actor| actor.location) else {
                    return Ok(Target::None);
                };
                let radius = radius()?;
                self.host
                    .entities_near(&center, radius)
                    .into_iter()
                    .filter_map(|entity| Some((center.distance_squared(&entity.location)?, entity)))
                    .min_by(|(a, x), (b, y)| by_distance(*a, *b).then_with(|| x.id.cmp(&y.id)))
                    .map_or(Target::None, |(_, entity)| Target::Entity(entity.id))
            }
            TargetKind::EntitiesInRadius => {
                let Some(center) = me.map(|actor| actor.location) else {
                    return Ok(Target::None);
                };
                let mut ids: Vec<_> = self
                    .host
                    .entities_near(&center, radius()?)
                    .into_iter()
                    .map(|entity| entity.id)
                    .collect();
                ids.sort_unstable();
                if ids.is_empty() { Target::None } else { Target::Entities(ids) }
            }
            TargetKind::ActorByName => {
                let name = resolver.text(params.name.as_ref(), "actor name")?;
                self.host
                    .actor_by_name(name.trim())
                    .map_or(Target::None, |actor| Target::Actor(actor.id))
            }
            TargetKind::Variable => {
                let raw = params
                    .name
                    .as_ref()
                    .map(Value::raw)
                    .ok_or_else(|| ScriptError::parse("missing variable name"))?;
                match ctx.get(&resolver.variable_name(&raw)) {
                    None | Some(RuntimeValue::None) => Target::None,
                    Some(RuntimeValue::Actor(id)) => Target::Actor(*id),
                    Some(RuntimeValue::Entity(id)) => Target::Entity(*id),
                    Some(RuntimeValue::Text(name)) => self
                        .host
                        .actor_by_name(name.trim())
                        .map_or_else(
                            || Target::Value(RuntimeValue::text(name.clone())),
                            |actor| Target::Actor(actor.id),
                        ),
                    Some(other) => Target::Value(other.clone()),
                }
            }
        })
    }

    /// Online actors the current target stands for. Fails when there are none.
    pub(super) fn target_actors(
        &self,
        ctx: &ExecutionContext,
        what: &str,
    ) -> ScriptResult<Vec<ActorInfo>> {
        let actors: Vec<_> = ctx
            .target()
            .actors()
            .into_iter()
            .filter_map(|id| self.host.actor(id))
            .collect();
        if actors.is_empty() {
            return Err(ScriptError::reference(format!("{what} needs an online actor target")));
        }
        Ok(actors)
    }
}

fn actor_group(actors: Vec<ActorInfo>) -> Target {
    if actors.is_empty() {
        return Target::None;
    }
    Target::Actors(actors.into_iter().map(|actor| actor.id).collect())
}

fn by_distance(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
