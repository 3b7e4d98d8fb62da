//! `TEXT` block operations.

use blockscript_lang::TextOp;

use crate::config::EngineConfig;
use crate::value::RuntimeValue;

/// Operands of a text operation, already resolved.
#[derive(Debug, Clone, Default)]
pub struct TextOperands {
    pub input: String,
    pub argument: String,
    pub replacement: String,
}

/// Apply `op`. Oversized operands and results are truncated, never rejected.
#[must_use]
pub fn apply(op: TextOp, operands: TextOperands, config: &EngineConfig) -> RuntimeValue {
    let input = truncate(operands.input, config.text_input_limit, "input");
    let argument = truncate(operands.argument, config.text_argument_limit, "argument");
    let replacement = truncate(operands.replacement, config.text_argument_limit, "replacement");

    let text = match op {
        TextOp::Concat => input + &argument,
        TextOp::Replace if argument.is_empty() => input,
        TextOp::Replace => input.replace(&argument, &replacement),
        TextOp::Uppercase => input.to_uppercase(),
        TextOp::Lowercase => input.to_lowercase(),
        TextOp::Trim => input.trim().to_string(),
        TextOp::Length => return RuntimeValue::Number(input.chars().count() as f64),
        TextOp::SplitJoin if argument.is_empty() => input,
        TextOp::SplitJoin => input
            .split(argument.as_str())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(&replacement),
        TextOp::Contains => return RuntimeValue::Boolean(input.contains(&argument)),
        TextOp::StartsWith => return RuntimeValue::Boolean(input.starts_with(&argument)),
        TextOp::EndsWith => return RuntimeValue::Boolean(input.ends_with(&argument)),
    };
    RuntimeValue::Text(truncate(text, config.text_output_limit, "result"))
}

/// Keep at most `max` characters.
pub(crate) fn truncate(text: String, max: usize, what: &str) -> String {
    if text.chars().count() <= max {
        return text;
    }
    tracing::warn!("text {} longer than {} characters, truncating", what, max);
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: TextOp, input: &str, argument: &str, replacement: &str) -> RuntimeValue {
        let operands = TextOperands {
            input: input.into(),
            argument: argument.into(),
            replacement: replacement.into(),
        };
        apply(op, operands, &EngineConfig::default())
    }

    #[test]
    fn test_basic_ops() {
        assert_eq!(run(TextOp::Concat, "ab", "cd", ""), RuntimeValue::text("abcd"));
        assert_eq!(run(TextOp::Replace, "a-b-c", "-", "+"), RuntimeValue::text("a+b+c"));
        assert_eq!(run(TextOp::Length, "héllo", "", ""), RuntimeValue::Number(5.0));
        assert_eq!(run(TextOp::SplitJoin, "a, b ,c", ",", "|"), RuntimeValue::text("a|b|c"));
        assert_eq!(run(TextOp::EndsWith, "stone", "one", ""), RuntimeValue::Boolean(true));
    }

    #[test]
    fn test_input_truncated() {
        let config = EngineConfig {
            text_input_limit: 3,
            ..EngineConfig::default()
        };
        let operands = TextOperands {
            input: "abcdef".into(),
            ..TextOperands::default()
        };
        assert_eq!(apply(TextOp::Uppercase, operands, &config), RuntimeValue::text("ABC"));
    }

    #[test]
    fn test_output_truncated() {
        let config = EngineConfig {
            text_output_limit: 4,
            ..EngineConfig::default()
        };
        let operands = TextOperands {
            input: "aaa".into(),
            argument: "bbb".into(),
            replacement: String::new(),
        };
        assert_eq!(apply(TextOp::Concat, operands, &config), RuntimeValue::text("aaab"));
    }
}
