//! The block tree node and its structural validation.

use std::fmt;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::kinds::{Arity, BlockKind, BlockType, LoopMode, TextOp, VariableOp};
use crate::schema::{ParamKind, ParamValue};
use crate::value::Value;

/// Stable identity of a block, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(Uuid);

impl BlockId {
    /// A fresh, never before used identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A node of the block tree.
///
/// Children are owned, so a block can never be its own descendant or have two parents.
/// `Clone` keeps identities; use [`Block::duplicate`] to copy a subtree that will live next to
/// the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    kind: BlockKind,
    children: Vec<Block>,
}

impl Block {
    #[must_use]
    pub fn new(kind: BlockKind) -> Self {
        Self::with_id(BlockId::new(), kind)
    }

    #[must_use]
    pub const fn with_id(id: BlockId, kind: BlockKind) -> Self {
        Self {
            id,
            kind,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Block>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn push_child(&mut self, child: Block) {
        self.children.push(child);
    }

    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut BlockKind {
        &mut self.kind
    }

    #[must_use]
    pub const fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    #[must_use]
    pub fn children(&self) -> &[Block] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Block> {
        &mut self.children
    }

    /// Deep copy with fresh identities for every node.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            id: BlockId::new(),
            kind: self.kind.clone(),
            children: self.children.iter().map(Self::duplicate).collect(),
        }
    }

    /// Find `id` in this subtree.
    #[must_use]
    pub fn find(&self, id: BlockId) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Pre-order walk over this block and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Self> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// Structural check of this subtree. Never evaluates variables.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();
        self.collect_problems(&mut problems, &mut HashSet::new());
        problems.into_iter().next().map_or(Ok(()), Err)
    }

    pub(crate) fn collect_problems(
        &self,
        problems: &mut Vec<ValidationError>,
        seen: &mut HashSet<BlockId>,
    ) {
        if !seen.insert(self.id) {
            problems.push(ValidationError::DuplicateId(self.id));
        }
        self.check_params(problems);

        let ty = self.block_type();
        if !self.children.is_empty() && !ty.accepts_children() {
            problems.push(ValidationError::UnexpectedChildren { block: self.id, ty });
        }
        check_sequence(&self.children, false, problems);
        for child in &self.children {
            child.collect_problems(problems, seen);
        }
    }

    fn check_params(&self, problems: &mut Vec<ValidationError>) {
        let ty = self.block_type();
        let bag = self.kind.to_params();

        for spec in ty.schema() {
            match bag.get(spec.name) {
                None if spec.required => problems.push(ValidationError::MissingParameter {
                    block: self.id,
                    ty,
                    name: spec.name,
                }),
                Some(ParamValue::Value(value)) => {
                    if let ParamKind::Value(Some(expected)) = spec.kind {
                        if !value.satisfies(expected) {
                            problems.push(ValidationError::WrongValueKind {
                                block: self.id,
                                ty,
                                name: spec.name,
                                expected,
                                found: value.kind(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        for (name, value) in bag.iter() {
            if let Some(raw) = non_finite_number(value) {
                problems.push(ValidationError::InvalidParameter {
                    block: self.id,
                    ty,
                    reason: format!("parameter '{name}' is not a finite number: {raw}"),
                });
            }
        }

        if let Some(reason) = self.variant_problem() {
            problems.push(ValidationError::InvalidParameter {
                block: self.id,
                ty,
                reason,
            });
        }
    }

    /// Requirements that depend on another parameter's value.
    fn variant_problem(&self) -> Option<String> {
        match &self.kind {
            BlockKind::If(condition) => {
                let check = condition.check?;
                let (needs_left, needs_right) = check.operands();
                if needs_left && condition.left.is_none() {
                    return Some(format!("{check} needs a left operand"));
                }
                if needs_right && condition.right.is_none() {
                    return Some(format!("{check} needs a right operand"));
                }
                None
            }
            BlockKind::Repeat(params) if params.interval == 0 => {
                Some("interval must be at least one tick".into())
            }
            BlockKind::Repeat(params) => match params.mode? {
                LoopMode::Times if params.count.is_none() => Some("TIMES needs a count".into()),
                LoopMode::ForEach if params.list.is_none() => Some("FOR_EACH needs a list".into()),
                mode @ (LoopMode::While | LoopMode::Until) => match &params.condition {
                    None => Some(format!("{mode} needs a condition")),
                    Some(c) if c.check.is_none() => Some(format!("{mode} condition has no check")),
                    Some(_) => None,
                },
                _ => None,
            },
            BlockKind::Target(params) => {
                let kind = params.kind?;
                (kind.uses_name() && params.name.is_none())
                    .then(|| format!("{kind} needs a name"))
            }
            BlockKind::Function(params) => {
                if params.name.trim().is_empty() {
                    return Some("function name is empty".into());
                }
                let mut names = HashSet::new();
                params
                    .parameters
                    .iter()
                    .find(|name| !names.insert(name.as_str()))
                    .map(|name| format!("parameter '{name}' is declared twice"))
            }
            BlockKind::Variable(params) => {
                let op = params.op?;
                if op.needs_value() && params.value.is_none() {
                    return Some(format!("{op} needs a value"));
                }
                (op == VariableOp::RandomNumber && params.extra.is_none())
                    .then(|| format!("{op} needs an upper bound"))
            }
            BlockKind::Math(params) => {
                let op = params.op?;
                (op.arity() == Arity::Binary && params.right.is_none())
                    .then(|| format!("{op} needs a right operand"))
            }
            BlockKind::Text(params) => {
                let op = params.op?;
                let needs_argument = op.arity() == Arity::Binary && op != TextOp::Concat;
                (needs_argument && params.argument.is_none())
                    .then(|| format!("{op} needs an argument"))
            }
            _ => None,
        }
    }
}

/// Raw text of a literal number that is NaN or infinite. Such numbers have no JSON form.
fn non_finite_number(value: &ParamValue) -> Option<&str> {
    let values: Vec<&Value> = match value {
        ParamValue::Value(value) => vec![value],
        ParamValue::Condition(condition) => {
            condition.left.iter().chain(&condition.right).collect()
        }
        ParamValue::ValueMap(map) => map.values().collect(),
        _ => Vec::new(),
    };
    values.into_iter().find_map(|value| match value {
        Value::Number(n) if n.as_literal().is_some_and(|n| !n.is_finite()) => Some(n.raw()),
        _ => None,
    })
}

/// Sibling-order rules: `ELSE` directly after `IF`, `EVENT` only at the head of a line.
pub(crate) fn check_sequence(
    blocks: &[Block],
    is_line: bool,
    problems: &mut Vec<ValidationError>,
) {
    let mut previous: Option<BlockType> = None;
    for (index, block) in blocks.iter().enumerate() {
        match block.block_type() {
            BlockType::Else if previous != Some(BlockType::If) => {
                problems.push(ValidationError::DanglingElse(block.id));
            }
            BlockType::Event if !(is_line && index == 0) => {
                problems.push(ValidationError::MisplacedEvent(block.id));
            }
            _ => {}
        }
        previous = Some(block.block_type());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::kinds::{EventKind, MathOp, RepeatParams, VariableOp, VariableParams};
    use crate::value::{ItemSpec, Value};

    fn set(name: &str, value: f64) -> Block {
        Block::new(BlockKind::Variable(
            VariableParams::new(VariableOp::Set, name).value(value),
        ))
    }

    #[test]
    fn test_duplicate_assigns_fresh_ids() {
        let tree = Block::new(BlockKind::Repeat(RepeatParams::times(2.0)))
            .with_children([set("a", 1.0), set("b", 2.0)]);
        let copy = tree.duplicate();

        assert_eq!(copy.kind(), tree.kind());
        assert_ne!(copy.id(), tree.id());
        for (a, b) in copy.walk().zip(tree.walk()) {
            assert_ne!(a.id(), b.id());
        }
    }

    #[test]
    fn test_walk_is_pre_order() {
        let inner =
            Block::new(BlockKind::If(Condition::equals(1.0, 1.0))).with_children([set("x", 1.0)]);
        let tree = Block::new(BlockKind::Repeat(RepeatParams::times(1.0)))
            .with_children([inner, set("y", 2.0)]);

        let order: Vec<BlockType> = tree.walk().map(Block::block_type).collect();
        assert_eq!(
            order,
            [BlockType::Repeat, BlockType::If, BlockType::Variable, BlockType::Variable]
        );
    }

    #[test]
    fn test_missing_required_parameter() {
        let block = Block::new(BlockKind::math(MathOp::Add, 1.0, Some(2.0.into()), ""));
        assert!(matches!(
            block.validate(),
            Err(ValidationError::MissingParameter { name: "result", .. })
        ));
    }

    #[test]
    fn test_binary_math_needs_right() {
        let block = Block::new(BlockKind::math(MathOp::Divide, 1.0, None, "r"));
        assert!(matches!(block.validate(), Err(ValidationError::InvalidParameter { .. })));

        let block = Block::new(BlockKind::math(MathOp::Sqrt, 9.0, None, "r"));
        assert_eq!(block.validate(), Ok(()));
    }

    #[test]
    fn test_wrong_value_kind() {
        let item = Value::Item(ItemSpec::parse("STONE"));
        let block = Block::new(BlockKind::math(MathOp::Add, item, Some(1.0.into()), "r"));
        assert!(matches!(
            block.validate(),
            Err(ValidationError::WrongValueKind { name: "left", .. })
        ));
    }

    #[test]
    fn test_children_only_on_control_flow() {
        let block = Block::new(BlockKind::message("hi")).with_children([set("a", 1.0)]);
        assert!(matches!(
            block.validate(),
            Err(ValidationError::UnexpectedChildren { .. })
        ));
    }

    #[test]
    fn test_else_must_follow_if() {
        let tree = Block::new(BlockKind::Repeat(RepeatParams::times(1.0)))
            .with_children([set("a", 1.0), Block::new(BlockKind::Else)]);
        assert!(matches!(tree.validate(), Err(ValidationError::DanglingElse(_))));
    }

    #[test]
    fn test_nested_event_is_misplaced() {
        let tree = Block::new(BlockKind::Repeat(RepeatParams::times(1.0)))
            .with_children([Block::new(BlockKind::event(EventKind::Join))]);
        assert!(matches!(tree.validate(), Err(ValidationError::MisplacedEvent(_))));
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let mut params = RepeatParams::times(3.0).asynchronous();
        params.interval = 0;
        let block = Block::new(BlockKind::Repeat(params));
        assert!(matches!(block.validate(), Err(ValidationError::InvalidParameter { .. })));
    }

    #[test]
    fn test_non_finite_numbers_are_invalid() {
        let block = Block::new(BlockKind::math(MathOp::Add, f64::NAN, Some(1.0.into()), "r"));
        assert!(matches!(block.validate(), Err(ValidationError::InvalidParameter { .. })));

        let left = Value::number_raw("inf");
        let block = Block::new(BlockKind::math(MathOp::Add, left, Some(1.0.into()), "r"));
        assert!(matches!(block.validate(), Err(ValidationError::InvalidParameter { .. })));

        let guarded = RepeatParams::with_condition(
            LoopMode::While,
            Condition::less_than(Value::variable("i"), f64::INFINITY),
        );
        let block = Block::new(BlockKind::Repeat(guarded));
        assert!(matches!(block.validate(), Err(ValidationError::InvalidParameter { .. })));

        let left = Value::number_raw("{n}");
        let block = Block::new(BlockKind::math(MathOp::Add, left, Some(1.0.into()), "r"));
        assert_eq!(block.validate(), Ok(()));
    }

    #[test]
    fn test_while_requires_condition() {
        let block = Block::new(BlockKind::Repeat(RepeatParams::new(LoopMode::While)));
        assert!(block.validate().is_err());

        let block = Block::new(BlockKind::Repeat(RepeatParams::with_condition(
            LoopMode::While,
            Condition::less_than(Value::variable("i"), 3.0),
        )));
        assert_eq!(block.validate(), Ok(()));
    }
}
