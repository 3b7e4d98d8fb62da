//! Block variants and their strongly-typed parameters.

use std::collections::BTreeMap;

use crate::condition::Condition;
use crate::value::Value;

/// Host event kinds a line can be triggered by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EventKind {
    Join,
    Quit,
    Chat,
    Death,
    /// The actor took damage (`victim` role).
    Damage,
    /// The actor hit something (`damager` role).
    Attack,
    /// The actor killed something (`killer` role).
    Kill,
    /// A projectile shot by the actor hit (`shooter` role).
    ProjectileHit,
    BlockBreak,
    BlockPlace,
    Interact,
    Respawn,
    Move,
    Sneak,
    Command,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LoopMode {
    Times,
    While,
    ForEach,
    Forever,
    Until,
}

impl LoopMode {
    /// Loops whose only exit may be the iteration cap.
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        matches!(self, Self::While | Self::Forever | Self::Until)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TargetKind {
    CurrentActor,
    AllOnline,
    /// Online actors in the same world as the current actor.
    SameWorld,
    NearestActor,
    RandomActor,
    NearestEntity,
    EntitiesInRadius,
    ActorByName,
    /// The value stored in a named variable.
    Variable,
}

impl TargetKind {
    #[must_use]
    pub const fn uses_radius(self) -> bool {
        matches!(
            self,
            Self::NearestActor | Self::NearestEntity | Self::EntitiesInRadius
        )
    }

    #[must_use]
    pub const fn uses_name(self) -> bool {
        matches!(self, Self::ActorByName | Self::Variable)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum VariableOp {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
    Append,
    Increment,
    Decrement,
    Clear,
    Copy,
    RandomNumber,
    RandomChoice,
    ToNumber,
    ToText,
    /// Read `name`/`health`/`food`/`level`/`x`/`y`/`z`/`coordinates`/`world` of the target.
    ActorInfo,
}

impl VariableOp {
    /// Whether the operation reads the `value` parameter.
    #[must_use]
    pub const fn needs_value(self) -> bool {
        !matches!(
            self,
            Self::Increment | Self::Decrement | Self::Clear | Self::ToNumber | Self::ToText
        )
    }
}

/// Operand count of a math or text operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Sqrt,
    Abs,
    Round,
    Floor,
    Ceil,
    Min,
    Max,
    Random,
}

impl MathOp {
    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Sqrt | Self::Abs | Self::Round | Self::Floor | Self::Ceil => Arity::Unary,
            _ => Arity::Binary,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TextOp {
    Concat,
    Replace,
    Uppercase,
    Lowercase,
    Trim,
    Length,
    SplitJoin,
    Contains,
    StartsWith,
    EndsWith,
}

impl TextOp {
    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Uppercase | Self::Lowercase | Self::Trim | Self::Length => Arity::Unary,
            _ => Arity::Binary,
        }
    }
}

/// Block discriminator, the `type` tag of a stored block.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Event,
    If,
    Else,
    Repeat,
    Target,
    Function,
    CallFunction,
    Variable,
    Math,
    Text,
    Message,
    Teleport,
    SideEffect,
    Delay,
    StopLoop,
    Break,
    Continue,
    Return,
}

impl BlockType {
    /// Control-flow constructs iterate their own children instead of leaving it to the
    /// interpreter's uniform sibling walk.
    #[must_use]
    pub const fn is_control_flow(self) -> bool {
        matches!(
            self,
            Self::If | Self::Else | Self::Repeat | Self::Target | Self::Function | Self::Delay
        )
    }

    /// Only control-flow blocks may own children.
    #[must_use]
    pub const fn accepts_children(self) -> bool {
        self.is_control_flow()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventParams {
    pub event: Option<EventKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatParams {
    pub mode: Option<LoopMode>,
    /// Iteration count for `TIMES`.
    pub count: Option<Value>,
    /// List (variable or comma separated text) for `FOR_EACH`.
    pub list: Option<Value>,
    /// Predicate for `WHILE` / `UNTIL`.
    pub condition: Option<Condition>,
    /// Spread iterations over host ticks instead of running to completion.
    pub asynchronous: bool,
    /// Ticks between asynchronous iterations, at least one.
    pub interval: u32,
    /// Per-block override of the engine's iteration cap.
    pub max_iterations: Option<u32>,
}

impl RepeatParams {
    #[must_use]
    pub const fn new(mode: LoopMode) -> Self {
        Self {
            mode: Some(mode),
            count: None,
            list: None,
            condition: None,
            asynchronous: false,
            interval: 1,
            max_iterations: None,
        }
    }

    #[must_use]
    pub fn times(count: impl Into<Value>) -> Self {
        Self {
            count: Some(count.into()),
            ..Self::new(LoopMode::Times)
        }
    }

    #[must_use]
    pub fn for_each(list: impl Into<Value>) -> Self {
        Self {
            list: Some(list.into()),
            ..Self::new(LoopMode::ForEach)
        }
    }

    #[must_use]
    pub fn with_condition(mode: LoopMode, condition: Condition) -> Self {
        Self {
            condition: Some(condition),
            ..Self::new(mode)
        }
    }

    #[must_use]
    pub const fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    #[must_use]
    pub const fn capped(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetParams {
    pub kind: Option<TargetKind>,
    pub radius: Option<Value>,
    /// Actor name for `ACTOR_BY_NAME`, variable name for `VARIABLE`.
    pub name: Option<Value>,
}

impl TargetParams {
    #[must_use]
    pub const fn new(kind: TargetKind) -> Self {
        Self {
            kind: Some(kind),
            radius: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionParams {
    pub name: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallFunctionParams {
    pub function: String,
    /// Comma separated argument list; quotes and `{...}` group.
    pub arguments: String,
    /// Variable receiving the returned value.
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableParams {
    pub op: Option<VariableOp>,
    /// Variable name; may contain placeholders.
    pub name: String,
    pub value: Option<Value>,
    /// Second operand (upper bound for `RANDOM_NUMBER`).
    pub extra: Option<Value>,
}

impl VariableParams {
    pub fn new(op: VariableOp, name: impl Into<String>) -> Self {
        Self {
            op: Some(op),
            name: name.into(),
            value: None,
            extra: None,
        }
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn extra(mut self, value: impl Into<Value>) -> Self {
        self.extra = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MathParams {
    pub op: Option<MathOp>,
    pub left: Option<Value>,
    pub right: Option<Value>,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextParams {
    pub op: Option<TextOp>,
    pub input: Option<Value>,
    pub argument: Option<Value>,
    pub replacement: Option<Value>,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageParams {
    pub text: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeleportParams {
    pub location: Option<Value>,
}

/// An opaque call into an external subsystem (economy, GUI, notifications, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SideEffectParams {
    pub kind: String,
    pub arguments: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DelayParams {
    pub ticks: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnParams {
    pub value: Option<Value>,
}

/// The tagged union of block variants.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Event(EventParams),
    If(Condition),
    Else,
    Repeat(RepeatParams),
    Target(TargetParams),
    Function(FunctionParams),
    CallFunction(CallFunctionParams),
    Variable(VariableParams),
    Math(MathParams),
    Text(TextParams),
    Message(MessageParams),
    Teleport(TeleportParams),
    SideEffect(SideEffectParams),
    Delay(DelayParams),
    StopLoop,
    Break,
    Continue,
    Return(ReturnParams),
}

impl BlockKind {
    #[must_use]
    pub const fn block_type(&self) -> BlockType {
        match self {
            Self::Event(_) => BlockType::Event,
            Self::If(_) => BlockType::If,
            Self::Else => BlockType::Else,
            Self::Repeat(_) => BlockType::Repeat,
            Self::Target(_) => BlockType::Target,
            Self::Function(_) => BlockType::Function,
            Self::CallFunction(_) => BlockType::CallFunction,
            Self::Variable(_) => BlockType::Variable,
            Self::Math(_) => BlockType::Math,
            Self::Text(_) => BlockType::Text,
            Self::Message(_) => BlockType::Message,
            Self::Teleport(_) => BlockType::Teleport,
            Self::SideEffect(_) => BlockType::SideEffect,
            Self::Delay(_) => BlockType::Delay,
            Self::StopLoop => BlockType::StopLoop,
            Self::Break => BlockType::Break,
            Self::Continue => BlockType::Continue,
            Self::Return(_) => BlockType::Return,
        }
    }

    #[must_use]
    pub const fn event(kind: EventKind) -> Self {
        Self::Event(EventParams { event: Some(kind) })
    }

    pub fn function<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Function(FunctionParams {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        })
    }

    pub fn call(function: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::CallFunction(CallFunctionParams {
            function: function.into(),
            arguments: arguments.into(),
            result: None,
        })
    }

    pub fn math(
        op: MathOp,
        left: impl Into<Value>,
        right: Option<Value>,
        result: impl Into<String>,
    ) -> Self {
        Self::Math(MathParams {
            op: Some(op),
            left: Some(left.into()),
            right,
            result: result.into(),
        })
    }

    pub fn message(text: impl Into<Value>) -> Self {
        Self::Message(MessageParams {
            text: Some(text.into()),
        })
    }
}
