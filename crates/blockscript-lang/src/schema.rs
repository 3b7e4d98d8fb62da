//! Declarative parameter schemas.
//!
//! Every [`BlockType`] declares its parameters once as a table of [`ParamSpec`]. The same table
//! drives document decoding (which JSON shape a parameter has, which enum it names), structural
//! validation, and encoding back to a document. Variant code only moves values between its
//! typed struct and a [`ParamBag`].

use std::collections::BTreeMap;
use std::str::FromStr;

use strum::VariantNames;

use crate::condition::{Condition, ConditionKind};
use crate::kinds::{
    BlockKind, BlockType, CallFunctionParams, DelayParams, EventKind, EventParams,
    FunctionParams, LoopMode, MathOp, MathParams, MessageParams, RepeatParams, ReturnParams,
    SideEffectParams, TargetKind, TargetParams, TeleportParams, TextOp, TextParams, VariableOp,
    VariableParams,
};
use crate::value::{Value, ValueKind};

/// Expected shape of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A [`Value`]; `Some(kind)` restricts the structured kind it may have.
    Value(Option<ValueKind>),
    /// One of the listed enum names.
    Enum(&'static [&'static str]),
    Bool,
    Integer,
    /// Plain identifier-like text (names, argument lists).
    Text,
    /// A list of names.
    Names,
    /// A nested [`Condition`] object.
    Condition,
    /// Name → [`Value`] map.
    ValueMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
    }
}

const ANY: ParamKind = ParamKind::Value(None);
const NUMBER: ParamKind = ParamKind::Value(Some(ValueKind::Number));
const TEXT: ParamKind = ParamKind::Value(Some(ValueKind::Text));

const EVENT: &[ParamSpec] = &[required("event", ParamKind::Enum(EventKind::VARIANTS))];

const CONDITION: &[ParamSpec] = &[
    required("check", ParamKind::Enum(ConditionKind::VARIANTS)),
    optional("left", ANY),
    optional("right", ANY),
    optional("invert", ParamKind::Bool),
];

const REPEAT: &[ParamSpec] = &[
    required("mode", ParamKind::Enum(LoopMode::VARIANTS)),
    optional("count", NUMBER),
    optional("list", ANY),
    optional("condition", ParamKind::Condition),
    optional("async", ParamKind::Bool),
    optional("interval", ParamKind::Integer),
    optional("max_iterations", ParamKind::Integer),
];

const TARGET: &[ParamSpec] = &[
    required("target", ParamKind::Enum(TargetKind::VARIANTS)),
    optional("radius", NUMBER),
    optional("name", TEXT),
];

const FUNCTION: &[ParamSpec] = &[
    required("name", ParamKind::Text),
    optional("parameters", ParamKind::Names),
];

const CALL_FUNCTION: &[ParamSpec] = &[
    required("function", ParamKind::Text),
    optional("arguments", ParamKind::Text),
    optional("result", ParamKind::Text),
];

const VARIABLE: &[ParamSpec] = &[
    required("operation", ParamKind::Enum(VariableOp::VARIANTS)),
    required("name", ParamKind::Text),
    optional("value", ANY),
    optional("extra", ANY),
];

const MATH: &[ParamSpec] = &[
    required("operation", ParamKind::Enum(MathOp::VARIANTS)),
    required("left", NUMBER),
    optional("right", NUMBER),
    required("result", ParamKind::Text),
];

const TEXT_OP: &[ParamSpec] = &[
    required("operation", ParamKind::Enum(TextOp::VARIANTS)),
    required("input", TEXT),
    optional("argument", TEXT),
    optional("replacement", TEXT),
    required("result", ParamKind::Text),
];

const MESSAGE: &[ParamSpec] = &[required("text", TEXT)];
const TELEPORT: &[ParamSpec] = &[required("location", ParamKind::Value(Some(ValueKind::Location)))];
const SIDE_EFFECT: &[ParamSpec] = &[
    required("kind", ParamKind::Text),
    optional("arguments", ParamKind::ValueMap),
];
const DELAY: &[ParamSpec] = &[required("ticks", NUMBER)];
const RETURN: &[ParamSpec] = &[optional("value", ANY)];

impl BlockType {
    /// Parameter table for this block type.
    #[must_use]
    pub const fn schema(self) -> &'static [ParamSpec] {
        match self {
            Self::Event => EVENT,
            Self::If => CONDITION,
            Self::Repeat => REPEAT,
            Self::Target => TARGET,
            Self::Function => FUNCTION,
            Self::CallFunction => CALL_FUNCTION,
            Self::Variable => VARIABLE,
            Self::Math => MATH,
            Self::Text => TEXT_OP,
            Self::Message => MESSAGE,
            Self::Teleport => TELEPORT,
            Self::SideEffect => SIDE_EFFECT,
            Self::Delay => DELAY,
            Self::Return => RETURN,
            Self::Else | Self::StopLoop | Self::Break | Self::Continue => &[],
        }
    }

    /// Look up one parameter of this block type.
    #[must_use]
    pub fn param(self, name: &str) -> Option<&'static ParamSpec> {
        self.schema().iter().find(|spec| spec.name == name)
    }
}

/// A decoded parameter, shaped by its [`ParamKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Value(Value),
    Enum(String),
    Bool(bool),
    Integer(i64),
    Text(String),
    Names(Vec<String>),
    Condition(Condition),
    ValueMap(BTreeMap<String, Value>),
}

/// Untyped parameter map moved between documents and typed parameter structs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamBag {
    entries: BTreeMap<String, ParamValue>,
}

impl ParamBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.entries.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn put_value(&mut self, name: &str, value: Option<&Value>) {
        if let Some(value) = value {
            self.insert(name, ParamValue::Value(value.clone()));
        }
    }

    fn put_enum<E: AsRef<str>>(&mut self, name: &str, value: Option<E>) {
        if let Some(value) = value {
            self.insert(name, ParamValue::Enum(value.as_ref().to_string()));
        }
    }

    fn put_text(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.insert(name, ParamValue::Text(value.to_string()));
        }
    }

    fn take(&mut self, name: &str) -> Option<ParamValue> {
        self.entries.remove(name)
    }

    fn take_value(&mut self, name: &str) -> Option<Value> {
        match self.take(name)? {
            ParamValue::Value(v) => Some(v),
            ParamValue::Text(t) | ParamValue::Enum(t) => Some(Value::text(t)),
            ParamValue::Integer(i) => Some(Value::number(i as f64)),
            _ => None,
        }
    }

    /// Unknown enum names decode to `None` rather than failing the block.
    fn take_enum<E: FromStr>(&mut self, name: &str) -> Option<E> {
        let ParamValue::Enum(raw) = self.take(name)? else {
            return None;
        };
        let parsed = raw.parse().ok();
        if parsed.is_none() {
            tracing::warn!("unknown value '{}' for parameter '{}', leaving it unset", raw, name);
        }
        parsed
    }

    fn take_bool(&mut self, name: &str) -> bool {
        matches!(self.take(name), Some(ParamValue::Bool(true)))
    }

    fn take_integer(&mut self, name: &str) -> Option<i64> {
        match self.take(name)? {
            ParamValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    fn take_text(&mut self, name: &str) -> String {
        match self.take(name) {
            Some(ParamValue::Text(t) | ParamValue::Enum(t)) => t,
            _ => String::new(),
        }
    }

    fn take_condition(&mut self, name: &str) -> Option<Condition> {
        match self.take(name)? {
            ParamValue::Condition(c) => Some(c),
            _ => None,
        }
    }
}

impl BlockKind {
    /// Flatten the typed parameters into a bag keyed by schema names.
    #[must_use]
    pub fn to_params(&self) -> ParamBag {
        let mut bag = ParamBag::new();
        match self {
            Self::Event(p) => bag.put_enum("event", p.event),
            Self::If(c) => put_condition_fields(&mut bag, c),
            Self::Repeat(p) => {
                bag.put_enum("mode", p.mode);
                bag.put_value("count", p.count.as_ref());
                bag.put_value("list", p.list.as_ref());
                if let Some(c) = &p.condition {
                    bag.insert("condition", ParamValue::Condition(c.clone()));
                }
                if p.asynchronous {
                    bag.insert("async", ParamValue::Bool(true));
                }
                if p.interval != 1 {
                    bag.insert("interval", ParamValue::Integer(i64::from(p.interval)));
                }
                if let Some(max) = p.max_iterations {
                    bag.insert("max_iterations", ParamValue::Integer(i64::from(max)));
                }
            }
            Self::Target(p) => {
                bag.put_enum("target", p.kind);
                bag.put_value("radius", p.radius.as_ref());
                bag.put_value("name", p.name.as_ref());
            }
            Self::Function(p) => {
                bag.put_text("name", &p.name);
                if !p.parameters.is_empty() {
                    bag.insert("parameters", ParamValue::Names(p.parameters.clone()));
                }
            }
            Self::CallFunction(p) => {
                bag.put_text("function", &p.function);
                bag.put_text("arguments", &p.arguments);
                if let Some(result) = &p.result {
                    bag.put_text("result", result);
                }
            }
            Self::Variable(p) => {
                bag.put_enum("operation", p.op);
                bag.put_text("name", &p.name);
                bag.put_value("value", p.value.as_ref());
                bag.put_value("extra", p.extra.as_ref());
            }
            Self::Math(p) => {
                bag.put_enum("operation", p.op);
                bag.put_value("left", p.left.as_ref());
                bag.put_value("right", p.right.as_ref());
                bag.put_text("result", &p.result);
            }
            Self::Text(p) => {
                bag.put_enum("operation", p.op);
                bag.put_value("input", p.input.as_ref());
                bag.put_value("argument", p.argument.as_ref());
                bag.put_value("replacement", p.replacement.as_ref());
                bag.put_text("result", &p.result);
            }
            Self::Message(p) => bag.put_value("text", p.text.as_ref()),
            Self::Teleport(p) => bag.put_value("location", p.location.as_ref()),
            Self::SideEffect(p) => {
                bag.put_text("kind", &p.kind);
                if !p.arguments.is_empty() {
                    bag.insert("arguments", ParamValue::ValueMap(p.arguments.clone()));
                }
            }
            Self::Delay(p) => bag.put_value("ticks", p.ticks.as_ref()),
            Self::Return(p) => bag.put_value("value", p.value.as_ref()),
            Self::Else | Self::StopLoop | Self::Break | Self::Continue => {}
        }
        bag
    }

    /// Build the typed variant for `ty` from a decoded bag.
    ///
    /// Never fails: missing or unknown entries become unset fields, which structural
    /// validation reports.
    #[must_use]
    pub fn from_params(ty: BlockType, mut bag: ParamBag) -> Self {
        let kind = match ty {
            BlockType::Event => Self::Event(EventParams {
                event: bag.take_enum("event"),
            }),
            BlockType::If => Self::If(take_condition_fields(&mut bag)),
            BlockType::Else => Self::Else,
            BlockType::Repeat => Self::Repeat(RepeatParams {
                mode: bag.take_enum("mode"),
                count: bag.take_value("count"),
                list: bag.take_value("list"),
                condition: bag.take_condition("condition"),
                asynchronous: bag.take_bool("async"),
                interval: bag
                    .take_integer("interval")
                    .and_then(|i| u32::try_from(i).ok())
                    .unwrap_or(1)
                    .max(1),
                max_iterations: bag
                    .take_integer("max_iterations")
                    .and_then(|i| u32::try_from(i).ok()),
            }),
            BlockType::Target => Self::Target(TargetParams {
                kind: bag.take_enum("target"),
                radius: bag.take_value("radius"),
                name: bag.take_value("name"),
            }),
            BlockType::Function => Self::Function(FunctionParams {
                name: bag.take_text("name"),
                parameters: match bag.take("parameters") {
                    Some(ParamValue::Names(names)) => names,
                    _ => Vec::new(),
                },
            }),
            BlockType::CallFunction => Self::CallFunction(CallFunctionParams {
                function: bag.take_text("function"),
                arguments: bag.take_text("arguments"),
                result: Some(bag.take_text("result")).filter(|r| !r.is_empty()),
            }),
            BlockType::Variable => Self::Variable(VariableParams {
                op: bag.take_enum("operation"),
                name: bag.take_text("name"),
                value: bag.take_value("value"),
                extra: bag.take_value("extra"),
            }),
            BlockType::Math => Self::Math(MathParams {
                op: bag.take_enum("operation"),
                left: bag.take_value("left"),
                right: bag.take_value("right"),
                result: bag.take_text("result"),
            }),
            BlockType::Text => Self::Text(TextParams {
                op: bag.take_enum("operation"),
                input: bag.take_value("input"),
                argument: bag.take_value("argument"),
                replacement: bag.take_value("replacement"),
                result: bag.take_text("result"),
            }),
            BlockType::Message => Self::Message(MessageParams {
                text: bag.take_value("text"),
            }),
            BlockType::Teleport => Self::Teleport(TeleportParams {
                location: bag.take_value("location"),
            }),
            BlockType::SideEffect => Self::SideEffect(SideEffectParams {
                kind: bag.take_text("kind"),
                arguments: match bag.take("arguments") {
                    Some(ParamValue::ValueMap(map)) => map,
                    _ => BTreeMap::new(),
                },
            }),
            BlockType::Delay => Self::Delay(DelayParams {
                ticks: bag.take_value("ticks"),
            }),
            BlockType::StopLoop => Self::StopLoop,
            BlockType::Break => Self::Break,
            BlockType::Continue => Self::Continue,
            BlockType::Return => Self::Return(ReturnParams {
                value: bag.take_value("value"),
            }),
        };
        for (name, _) in bag.iter() {
            tracing::warn!("ignoring unknown parameter '{}' on {}", name, ty);
        }
        kind
    }
}

/// Conditions are stored flat on `If` blocks and nested under `condition` on loops.
pub(crate) fn put_condition_fields(bag: &mut ParamBag, condition: &Condition) {
    bag.put_enum("check", condition.check);
    bag.put_value("left", condition.left.as_ref());
    bag.put_value("right", condition.right.as_ref());
    if condition.invert {
        bag.insert("invert", ParamValue::Bool(true));
    }
}

pub(crate) fn take_condition_fields(bag: &mut ParamBag) -> Condition {
    Condition {
        check: bag.take_enum("check"),
        left: bag.take_value("left"),
        right: bag.take_value("right"),
        invert: bag.take_bool("invert"),
    }
}

/// Parameter table of a nested condition object.
#[must_use]
pub const fn condition_schema() -> &'static [ParamSpec] {
    CONDITION
}
