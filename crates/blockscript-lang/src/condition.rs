//! Predicates used by `If` blocks and conditional loops.

use crate::value::Value;

/// What a [`Condition`] checks.
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
pub enum ConditionKind {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    /// Text `left` contains text `right`.
    Contains,
    StartsWith,
    /// The variable named by `left` is set.
    VariableExists,
    /// The current target resolved to something.
    TargetExists,
    /// The target actor is in the world named by `left`.
    TargetInWorld,
    /// The target actor's health is above `left`.
    HealthAbove,
    /// Passes with probability `left` percent.
    Chance,
}

impl ConditionKind {
    /// Operands this check reads: `(left, right)`.
    #[must_use]
    pub const fn operands(self) -> (bool, bool) {
        match self {
            Self::Equals
            | Self::NotEquals
            | Self::GreaterThan
            | Self::GreaterOrEqual
            | Self::LessThan
            | Self::LessOrEqual
            | Self::Contains
            | Self::StartsWith => (true, true),
            Self::VariableExists | Self::TargetInWorld | Self::HealthAbove | Self::Chance => {
                (true, false)
            }
            Self::TargetExists => (false, false),
        }
    }
}

/// A single predicate with an optional inversion marker.
///
/// `check` is `None` when a stored document names a check this build does not know; such a
/// condition fails validation and evaluates to an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    pub check: Option<ConditionKind>,
    pub left: Option<Value>,
    pub right: Option<Value>,
    pub invert: bool,
}

impl Condition {
    #[must_use]
    pub const fn new(check: ConditionKind) -> Self {
        Self {
            check: Some(check),
            left: None,
            right: None,
            invert: false,
        }
    }

    #[must_use]
    pub fn left(mut self, value: impl Into<Value>) -> Self {
        self.left = Some(value.into());
        self
    }

    #[must_use]
    pub fn right(mut self, value: impl Into<Value>) -> Self {
        self.right = Some(value.into());
        self
    }

    #[must_use]
    pub const fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    /// `left == right`
    pub fn equals(left: impl Into<Value>, right: impl Into<Value>) -> Self {
        Self::new(ConditionKind::Equals).left(left).right(right)
    }

    /// `left < right`
    pub fn less_than(left: impl Into<Value>, right: impl Into<Value>) -> Self {
        Self::new(ConditionKind::LessThan).left(left).right(right)
    }

    /// `left >= right`
    pub fn at_least(left: impl Into<Value>, right: impl Into<Value>) -> Self {
        Self::new(ConditionKind::GreaterOrEqual).left(left).right(right)
    }
}
