use blockscript_lang::{
    ActorId, Block, BlockKind, CallFunctionParams, Condition, ConditionKind, DelayParams,
    EventKind, Line, LoopMode, MathOp, RepeatParams, ReturnParams, Script, TargetKind,
    TargetParams, Value, VariableOp, VariableParams,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::context::Target;
use crate::error::{ScriptError, ScriptResult};
use crate::memory_host::{MemoryHost, RecordingEffects};
use crate::value::{Location, RuntimeValue};

struct Harness {
    host: MemoryHost,
    effects: RecordingEffects,
    scheduler: TickScheduler,
    registry: LoopRegistry,
    config: EngineConfig,
    rng: StdRng,
    actor: ActorId,
}

impl Harness {
    fn new() -> Self {
        let mut host = MemoryHost::new("world");
        let actor = host.add_actor("alex", Location::new("world", 0.0, 64.0, 0.0));
        Self {
            host,
            effects: RecordingEffects::new(),
            scheduler: TickScheduler::new(),
            registry: LoopRegistry::new(),
            config: EngineConfig::seeded(11),
            rng: StdRng::seed_from_u64(11),
            actor,
        }
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext::detached(self.actor)
    }

    fn run(&mut self, blocks: &[Block], ctx: &mut ExecutionContext) -> ExecutionResult {
        let mut interp = Interpreter::new(
            &mut self.host,
            &mut self.effects,
            &mut self.scheduler,
            &self.registry,
            &self.config,
            &mut self.rng,
        );
        interp.execute_children(blocks, ctx)
    }

    fn run_line(&mut self, line: &Line, ctx: &mut ExecutionContext) -> ExecutionResult {
        let mut interp = Interpreter::new(
            &mut self.host,
            &mut self.effects,
            &mut self.scheduler,
            &self.registry,
            &self.config,
            &mut self.rng,
        );
        interp.run_line(line, ctx)
    }

    fn resolve(&mut self, params: &TargetParams, ctx: &ExecutionContext) -> ScriptResult<Target> {
        let mut interp = Interpreter::new(
            &mut self.host,
            &mut self.effects,
            &mut self.scheduler,
            &self.registry,
            &self.config,
            &mut self.rng,
        );
        interp.resolve_target(params, ctx)
    }
}

fn var(op: VariableOp, name: &str) -> VariableParams {
    VariableParams::new(op, name)
}

fn set(name: &str, value: impl Into<Value>) -> Block {
    Block::new(BlockKind::Variable(var(VariableOp::Set, name).value(value)))
}

fn increment(name: &str) -> Block {
    Block::new(BlockKind::Variable(var(VariableOp::Increment, name)))
}

fn repeat(params: RepeatParams, body: impl IntoIterator<Item = Block>) -> Block {
    Block::new(BlockKind::Repeat(params)).with_children(body)
}

fn when(condition: Condition, body: impl IntoIterator<Item = Block>) -> Block {
    Block::new(BlockKind::If(condition)).with_children(body)
}

fn number(ctx: &ExecutionContext, name: &str) -> Option<f64> {
    ctx.get(name).map(RuntimeValue::as_number)
}

#[test]
fn test_empty_children_succeed() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    assert_eq!(h.run(&[], &mut ctx), ExecutionResult::Success);
}

#[test]
fn test_else_follows_false_if_only() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [
        when(Condition::equals(1.0, 2.0), [set("branch", "if")]),
        Block::new(BlockKind::Else).with_children([set("branch", "else")]),
        when(Condition::equals(1.0, 1.0), [set("second", "if")]),
        Block::new(BlockKind::Else).with_children([set("second", "else")]),
    ];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("branch"), Some(&RuntimeValue::text("else")));
    assert_eq!(ctx.get("second"), Some(&RuntimeValue::text("if")));
}

#[test]
fn test_lone_else_does_nothing() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let orphan = Block::new(BlockKind::Else).with_children([set("ran", "yes")]);

    let mut interp = Interpreter::new(
        &mut h.host,
        &mut h.effects,
        &mut h.scheduler,
        &h.registry,
        &h.config,
        &mut h.rng,
    );
    assert_eq!(interp.execute(&orphan, &mut ctx), ExecutionResult::Success);
    assert!(!ctx.contains("ran"));
}

#[test]
fn test_times_publishes_ordered_index() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [repeat(
        RepeatParams::times(3.0),
        [Block::new(BlockKind::Variable(
            var(VariableOp::Append, "seen").value("{_loop_index}"),
        ))],
    )];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("seen"), Some(&RuntimeValue::text("012")));
    assert_eq!(number(&ctx, "_loop_count"), Some(3.0));
}

#[test]
fn test_times_bounds() {
    let mut h = Harness::new();

    let mut ctx = h.context();
    let blocks = [repeat(RepeatParams::times(-2.0), [increment("n")])];
    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert!(!ctx.contains("n"));

    let mut ctx = h.context();
    let blocks = [repeat(RepeatParams::times(5000.0), [increment("n")])];
    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(number(&ctx, "n"), Some(1000.0));
}

#[test]
fn test_unbounded_loop_hits_cap() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let forever =
        RepeatParams::with_condition(LoopMode::While, Condition::equals(1.0, 1.0)).capped(10);
    let blocks = [repeat(forever, [increment("n")])];

    let result = h.run(&blocks, &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Bounds(_))));
    assert_eq!(number(&ctx, "n"), Some(10.0));
}

#[test]
fn test_until_checks_after_body() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    ctx.set("n", 10.0);
    let until = RepeatParams::with_condition(
        LoopMode::Until,
        Condition::at_least(Value::variable("n"), 3.0),
    );
    let blocks = [repeat(until, [increment("n")])];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(number(&ctx, "n"), Some(11.0));
}

#[test]
fn test_break_ends_loop_successfully() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [
        repeat(
            RepeatParams::times(10.0),
            [
                increment("n"),
                when(
                    Condition::at_least(Value::variable("n"), 3.0),
                    [Block::new(BlockKind::Break)],
                ),
                increment("after_check"),
            ],
        ),
        set("done", "yes"),
    ];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(number(&ctx, "n"), Some(3.0));
    assert_eq!(number(&ctx, "after_check"), Some(2.0));
    assert_eq!(ctx.get("done"), Some(&RuntimeValue::text("yes")));
}

#[test]
fn test_continue_skips_rest_of_iteration() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [repeat(
        RepeatParams::times(4.0),
        [
            when(
                Condition::less_than(Value::variable("_loop_index"), 2.0),
                [Block::new(BlockKind::Continue)],
            ),
            increment("late"),
        ],
    )];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(number(&ctx, "late"), Some(2.0));
}

#[test]
fn test_for_each_exposes_value() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [repeat(
        RepeatParams::for_each("red, green, blue"),
        [Block::new(BlockKind::Variable(
            var(VariableOp::Append, "colors").value("{_loop_value};"),
        ))],
    )];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("colors"), Some(&RuntimeValue::text("red;green;blue;")));
}

#[test]
fn test_math_error_leaves_result_untouched() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    ctx.set("r", 7.0);
    let blocks = [
        Block::new(BlockKind::math(MathOp::Divide, 5.0, Some(Value::number(0.0)), "r")),
        set("unreached", "yes"),
    ];

    let result = h.run(&blocks, &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Arithmetic(_))));
    assert_eq!(number(&ctx, "r"), Some(7.0));
    assert!(!ctx.contains("unreached"));
}

#[test]
fn test_variable_divide_by_zero_is_noop() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    ctx.set("r", 7.0);
    let blocks = [Block::new(BlockKind::Variable(var(VariableOp::Divide, "r").value(0.0)))];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(number(&ctx, "r"), Some(7.0));
}

fn script_with_function(body: impl IntoIterator<Item = Block>, parameters: &[&str]) -> Script {
    let mut script = Script::new(ActorId::new(), "alex");
    script.push_line(Line::new("defs").with_blocks([
        Block::new(BlockKind::function("f", parameters.iter().copied())).with_children(body),
    ]));
    script
}

fn call(arguments: &str, result: Option<&str>) -> Block {
    Block::new(BlockKind::CallFunction(CallFunctionParams {
        function: "f".into(),
        arguments: arguments.into(),
        result: result.map(Into::into),
    }))
}

#[test]
fn test_argument_mismatch_never_runs_body() {
    let mut h = Harness::new();
    let script = script_with_function([set("ran", "yes")], &["a", "b"]);
    let mut ctx = ExecutionContext::new(h.actor, &script, 64);

    let result = h.run(&[call("1", None)], &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::State(_))));
    assert!(!ctx.contains("ran"));
}

#[test]
fn test_return_value_and_merge_back() {
    let mut h = Harness::new();
    let body = [
        set("total", "{a}"),
        set("scratch", 1.0),
        Block::new(BlockKind::Return(ReturnParams {
            value: Some(Value::text("{b}")),
        })),
        set("unreached", "yes"),
    ];
    let script = script_with_function(body, &["a", "b"]);
    let mut ctx = ExecutionContext::new(h.actor, &script, 64);
    ctx.set("total", 0.0);
    ctx.set("name", "steve");

    let result = h.run(&[call(r#"41, "hi {name}""#, Some("answer"))], &mut ctx);
    assert_eq!(result, ExecutionResult::Success);
    assert_eq!(ctx.get("total"), Some(&RuntimeValue::Number(41.0)));
    assert_eq!(ctx.get("answer"), Some(&RuntimeValue::text("hi steve")));
    assert!(!ctx.contains("scratch"));
    assert!(!ctx.contains("unreached"));
}

#[test]
fn test_unbounded_recursion_is_bounds_error() {
    let mut h = Harness::new();
    let script = script_with_function([call("", None)], &[]);
    let mut ctx = ExecutionContext::new(h.actor, &script, 64);

    let result = h.run(&[call("", None)], &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Bounds(_))));
}

#[test]
fn test_unknown_function() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let result = h.run(&[call("", None)], &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Reference(_))));
}

#[test]
fn test_nearest_actor_target() {
    let mut h = Harness::new();
    let near = h.host.add_actor("bea", Location::new("world", 3.0, 64.0, 0.0));
    let far = h.host.add_actor("cy", Location::new("world", 50.0, 64.0, 0.0));
    let mut ctx = h.context();
    let mut params = TargetParams::new(TargetKind::NearestActor);
    params.radius = Some(Value::number(10.0));
    let blocks = [Block::new(BlockKind::Target(params))
        .with_children([Block::new(BlockKind::message("hello %player%"))])];
    ctx.set_role("player", "alex");

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(h.host.messages(near), ["hello alex"]);
    assert!(h.host.messages(far).is_empty());
    assert!(h.host.messages(h.actor).is_empty());
    assert_eq!(ctx.target(), &Target::Actor(h.actor));
}

#[test]
fn test_unresolved_target_fails_message() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let mut params = TargetParams::new(TargetKind::ActorByName);
    params.name = Some(Value::text("nobody"));
    let blocks = [Block::new(BlockKind::Target(params))
        .with_children([Block::new(BlockKind::message("hi"))])];

    let result = h.run(&blocks, &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Reference(_))));
}

#[test]
fn test_inverted_variable_exists() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [when(
        Condition::new(ConditionKind::VariableExists).left("missing").inverted(),
        [set("absent", "yes")],
    )];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("absent"), Some(&RuntimeValue::text("yes")));
}

#[test]
fn test_delay_defers_children() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [Block::new(BlockKind::Delay(DelayParams {
        ticks: Some(Value::number(5.0)),
    }))
    .with_children([set("later", "yes")])];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert!(!ctx.contains("later"));
    assert_eq!(h.scheduler.pending_delays(), 1);
}

#[test]
fn test_second_async_loop_is_rejected() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [
        repeat(RepeatParams::new(LoopMode::Forever).asynchronous(), [increment("a")]),
        repeat(RepeatParams::new(LoopMode::Forever).asynchronous(), [increment("b")]),
    ];

    let result = h.run(&blocks, &mut ctx);
    assert_eq!(
        result,
        ExecutionResult::Error(ScriptError::state("loop already running for this actor"))
    );
    assert!(h.registry.is_running(h.actor));
    assert_eq!(h.scheduler.active_loops(), 1);
}

#[test]
fn test_side_effect_failure_is_error() {
    let mut h = Harness::new();
    h.effects.fail("economy.withdraw", "insufficient funds");
    let mut ctx = h.context();
    let mut params = blockscript_lang::SideEffectParams {
        kind: "economy.withdraw".into(),
        ..Default::default()
    };
    params.arguments.insert("amount".into(), Value::number(5.0));

    let result = h.run(&[Block::new(BlockKind::SideEffect(params))], &mut ctx);
    assert_eq!(
        result,
        ExecutionResult::Error(ScriptError::Effect {
            kind: "economy.withdraw".into(),
            message: "insufficient funds".into(),
        })
    );
}

fn on_join(name: &str, body: impl IntoIterator<Item = Block>) -> Line {
    let event = Block::new(BlockKind::event(EventKind::Join));
    Line::new(name).with_blocks(std::iter::once(event).chain(body))
}

#[test]
fn test_break_outside_loop_ends_line() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let body = [set("before", "yes"), Block::new(BlockKind::Break), set("after", "yes")];
    let line = on_join("early", body);

    assert_eq!(h.run_line(&line, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("before"), Some(&RuntimeValue::text("yes")));
    assert!(!ctx.contains("after"));
}

#[test]
fn test_continue_outside_loop_ends_line() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let line = on_join("early", [Block::new(BlockKind::Continue), set("after", "yes")]);

    assert_eq!(h.run_line(&line, &mut ctx), ExecutionResult::Success);
    assert!(!ctx.contains("after"));
}

#[test]
fn test_break_in_function_ends_call_only() {
    let mut h = Harness::new();
    let body = [
        set("marker", "inside"),
        Block::new(BlockKind::Break),
        set("marker", "after break"),
    ];
    let script = script_with_function(body, &[]);
    let mut ctx = ExecutionContext::new(h.actor, &script, 64);
    ctx.set("marker", "before");
    let line = on_join("caller", [call("", None), set("after_call", "yes")]);

    assert_eq!(h.run_line(&line, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("marker"), Some(&RuntimeValue::text("inside")));
    assert_eq!(ctx.get("after_call"), Some(&RuntimeValue::text("yes")));
}

#[test]
fn test_random_math_with_unusable_bounds_is_error() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    ctx.set("r", 7.0);

    let blocks = [Block::new(BlockKind::math(
        MathOp::Random,
        Value::number_raw("NaN"),
        Some(Value::number(1.0)),
        "r",
    ))];
    let result = h.run(&blocks, &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Arithmetic(_))));

    let blocks = [Block::new(BlockKind::math(
        MathOp::Random,
        -1e308,
        Some(Value::number(1e308)),
        "r",
    ))];
    let result = h.run(&blocks, &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Arithmetic(_))));
    assert_eq!(number(&ctx, "r"), Some(7.0));
}

#[test]
fn test_random_number_with_nan_bound_is_error() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let roll = var(VariableOp::RandomNumber, "roll")
        .value(Value::number_raw("NaN"))
        .extra(6.0);

    let result = h.run(&[Block::new(BlockKind::Variable(roll))], &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Arithmetic(_))));
    assert!(!ctx.contains("roll"));
}

#[test]
fn test_huge_delay_never_comes_due() {
    let mut h = Harness::new();
    h.scheduler.advance();
    let mut ctx = h.context();
    let blocks = [Block::new(BlockKind::Delay(DelayParams {
        ticks: Some(Value::number(1e30)),
    }))
    .with_children([set("later", "yes")])];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(h.scheduler.pending_delays(), 1);

    h.scheduler.advance();
    assert_eq!(h.scheduler.poll_deferred(|_, _| {}), 0);
    assert_eq!(h.scheduler.pending_delays(), 1);
}

fn target(kind: TargetKind) -> TargetParams {
    TargetParams::new(kind)
}

fn message_to(params: TargetParams, text: &str) -> Block {
    Block::new(BlockKind::Target(params)).with_children([Block::new(BlockKind::message(text))])
}

#[test]
fn test_all_online_target_reaches_everyone() {
    let mut h = Harness::new();
    let bea = h.host.add_actor("bea", Location::new("nether", 0.0, 64.0, 0.0));
    let mut ctx = h.context();

    let result = h.run(&[message_to(target(TargetKind::AllOnline), "hi all")], &mut ctx);
    assert_eq!(result, ExecutionResult::Success);
    assert_eq!(h.host.messages(h.actor), ["hi all"]);
    assert_eq!(h.host.messages(bea), ["hi all"]);
}

#[test]
fn test_same_world_target() {
    let mut h = Harness::new();
    let bea = h.host.add_actor("bea", Location::new("world", 100.0, 64.0, 0.0));
    let cy = h.host.add_actor("cy", Location::new("nether", 0.0, 64.0, 0.0));
    let mut ctx = h.context();

    let resolved = h.resolve(&target(TargetKind::SameWorld), &ctx).unwrap();
    assert_eq!(resolved, Target::Actors(vec![h.actor, bea]));

    h.run(&[message_to(target(TargetKind::SameWorld), "local")], &mut ctx);
    assert!(h.host.messages(cy).is_empty());
    assert_eq!(h.host.messages(bea), ["local"]);
}

#[test]
fn test_random_actor_target_picks_one() {
    let mut h = Harness::new();
    let bea = h.host.add_actor("bea", Location::new("world", 0.0, 64.0, 0.0));
    let mut ctx = h.context();

    let result = h.run(&[message_to(target(TargetKind::RandomActor), "lucky")], &mut ctx);
    assert_eq!(result, ExecutionResult::Success);
    assert_eq!(h.host.messages(h.actor).len() + h.host.messages(bea).len(), 1);
}

#[test]
fn test_nearest_actor_tie_breaks_by_name() {
    let mut h = Harness::new();
    h.host.add_actor("cy", Location::new("world", 3.0, 64.0, 0.0));
    let bea = h.host.add_actor("bea", Location::new("world", -3.0, 64.0, 0.0));
    let ctx = h.context();

    let resolved = h.resolve(&target(TargetKind::NearestActor), &ctx).unwrap();
    assert_eq!(resolved, Target::Actor(bea));
}

#[test]
fn test_nearest_entity_target() {
    let mut h = Harness::new();
    let first = h.host.add_entity("zombie", Location::new("world", 4.0, 64.0, 0.0));
    h.host.add_entity("zombie", Location::new("world", -4.0, 64.0, 0.0));
    h.host.add_entity("zombie", Location::new("world", 8.0, 64.0, 0.0));
    h.host.add_entity("zombie", Location::new("world", 40.0, 64.0, 0.0));
    let ctx = h.context();

    let resolved = h.resolve(&target(TargetKind::NearestEntity), &ctx).unwrap();
    assert_eq!(resolved, Target::Entity(first));
}

#[test]
fn test_entities_in_radius_target() {
    let mut h = Harness::new();
    let a = h.host.add_entity("cow", Location::new("world", 2.0, 64.0, 0.0));
    let b = h.host.add_entity("cow", Location::new("world", 0.0, 64.0, 5.0));
    h.host.add_entity("cow", Location::new("world", 30.0, 64.0, 0.0));
    let ctx = h.context();

    let mut params = target(TargetKind::EntitiesInRadius);
    params.radius = Some(Value::number(10.0));
    assert_eq!(h.resolve(&params, &ctx).unwrap(), Target::Entities(vec![a, b]));

    params.radius = Some(Value::number(1.0));
    assert_eq!(h.resolve(&params, &ctx).unwrap(), Target::None);
}

#[test]
fn test_variable_target() {
    let mut h = Harness::new();
    let bea = h.host.add_actor("bea", Location::new("world", 0.0, 64.0, 0.0));
    let mut ctx = h.context();
    let mut params = target(TargetKind::Variable);
    params.name = Some(Value::text("who"));

    assert_eq!(h.resolve(&params, &ctx).unwrap(), Target::None);

    ctx.set("who", "bea");
    assert_eq!(h.resolve(&params, &ctx).unwrap(), Target::Actor(bea));

    ctx.set("who", "ghost");
    assert_eq!(
        h.resolve(&params, &ctx).unwrap(),
        Target::Value(RuntimeValue::text("ghost"))
    );
}

#[test]
fn test_empty_target_fails_actor_blocks() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let blocks = [message_to(target(TargetKind::EntitiesInRadius), "nobody hears this")];

    let result = h.run(&blocks, &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Reference(_))));
    assert!(h.host.messages(h.actor).is_empty());
}

#[test]
fn test_copy_variable() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    ctx.set("src", 5.0);
    let copy =
        |from: &str| Block::new(BlockKind::Variable(var(VariableOp::Copy, "dst").value(from)));

    assert_eq!(h.run(&[copy("src")], &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("dst"), Some(&RuntimeValue::Number(5.0)));

    let result = h.run(&[copy("missing")], &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Reference(_))));
}

#[test]
fn test_to_number_and_to_text() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    ctx.set("n", " 42 ");
    ctx.set("junk", "abc");
    ctx.set("t", 3.0);
    let blocks = [
        Block::new(BlockKind::Variable(var(VariableOp::ToNumber, "n"))),
        Block::new(BlockKind::Variable(var(VariableOp::ToNumber, "junk"))),
        Block::new(BlockKind::Variable(var(VariableOp::ToText, "t"))),
    ];

    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("n"), Some(&RuntimeValue::Number(42.0)));
    assert_eq!(ctx.get("junk"), Some(&RuntimeValue::Number(0.0)));
    assert_eq!(ctx.get("t"), Some(&RuntimeValue::text("3")));
}

#[test]
fn test_actor_info_reads_target() {
    let mut h = Harness::new();
    let mut ctx = h.context();
    let info = |name: &str, key: &str| {
        Block::new(BlockKind::Variable(var(VariableOp::ActorInfo, name).value(key)))
    };

    let blocks = [info("hp", "health"), info("where", "world"), info("who", "name")];
    assert_eq!(h.run(&blocks, &mut ctx), ExecutionResult::Success);
    assert_eq!(ctx.get("hp"), Some(&RuntimeValue::Number(20.0)));
    assert_eq!(ctx.get("where"), Some(&RuntimeValue::text("world")));
    assert_eq!(ctx.get("who"), Some(&RuntimeValue::text("alex")));

    let result = h.run(&[info("x", "mana")], &mut ctx);
    assert!(matches!(result, ExecutionResult::Error(ScriptError::Reference(_))));
}
