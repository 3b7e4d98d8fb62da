//! `MATH` block arithmetic.

use blockscript_lang::MathOp;
use rand::Rng;

use crate::error::{ScriptError, ScriptResult};

/// Apply `op`. Unary operations ignore `right`.
///
/// Domain errors and non-finite results are errors. Results beyond `limit` are clamped.
pub fn apply(
    op: MathOp,
    left: f64,
    right: f64,
    limit: f64,
    rng: &mut impl Rng,
) -> ScriptResult<f64> {
    let result = match op {
        MathOp::Add => left + right,
        MathOp::Subtract => left - right,
        MathOp::Multiply => left * right,
        MathOp::Divide => {
            if right == 0.0 {
                return Err(ScriptError::arithmetic("division by zero"));
            }
            left / right
        }
        MathOp::Modulo => {
            if right == 0.0 {
                return Err(ScriptError::arithmetic("modulo by zero"));
            }
            left % right
        }
        MathOp::Power => {
            if left < 0.0 && right.fract() != 0.0 {
                return Err(ScriptError::arithmetic(format!(
                    "cannot raise negative {left} to non-integer power {right}"
                )));
            }
            left.powf(right)
        }
        MathOp::Sqrt => {
            if left < 0.0 {
                return Err(ScriptError::arithmetic(format!(
                    "square root of negative number {left}"
                )));
            }
            left.sqrt()
        }
        MathOp::Abs => left.abs(),
        MathOp::Round => left.round(),
        MathOp::Floor => left.floor(),
        MathOp::Ceil => left.ceil(),
        MathOp::Min => left.min(right),
        MathOp::Max => left.max(right),
        MathOp::Random => {
            let (lo, hi) = if left <= right { (left, right) } else { (right, left) };
            if !lo.is_finite() || !hi.is_finite() || !(hi - lo).is_finite() {
                return Err(ScriptError::arithmetic(format!(
                    "cannot pick a random number between {left} and {right}"
                )));
            }
            if (hi - lo).abs() <= f64::EPSILON {
                lo
            } else {
                rng.random_range(lo..hi)
            }
        }
    };

    if !result.is_finite() {
        return Err(ScriptError::arithmetic(format!("{op} produced a non-finite result")));
    }
    if result.abs() > limit {
        tracing::warn!("{} result {} clamped to ±{}", op, result, limit);
        return Ok(result.clamp(-limit, limit));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const LIMIT: f64 = 1e15;

    fn run(op: MathOp, left: f64, right: f64) -> ScriptResult<f64> {
        apply(op, left, right, LIMIT, &mut StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_domain_errors() {
        assert!(matches!(run(MathOp::Divide, 5.0, 0.0), Err(ScriptError::Arithmetic(_))));
        assert!(matches!(run(MathOp::Modulo, 5.0, 0.0), Err(ScriptError::Arithmetic(_))));
        assert!(matches!(run(MathOp::Sqrt, -4.0, 0.0), Err(ScriptError::Arithmetic(_))));
        assert!(matches!(run(MathOp::Power, -8.0, 0.5), Err(ScriptError::Arithmetic(_))));
        assert_eq!(run(MathOp::Power, -2.0, 3.0), Ok(-8.0));
    }

    #[test]
    fn test_non_finite_is_error() {
        assert!(run(MathOp::Power, 10.0, 400.0).is_err());
    }

    #[test]
    fn test_large_results_are_clamped() {
        assert_eq!(run(MathOp::Multiply, 1e10, 1e10), Ok(LIMIT));
        assert_eq!(run(MathOp::Multiply, -1e10, 1e10), Ok(-LIMIT));
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let n = apply(MathOp::Random, 10.0, 1.0, LIMIT, &mut rng).unwrap();
            assert!((1.0..10.0).contains(&n));
        }
        assert_eq!(run(MathOp::Random, 3.0, 3.0), Ok(3.0));
    }

    #[test]
    fn test_random_rejects_unusable_bounds() {
        assert!(matches!(run(MathOp::Random, f64::NAN, 1.0), Err(ScriptError::Arithmetic(_))));
        assert!(matches!(run(MathOp::Random, 1.0, f64::INFINITY), Err(ScriptError::Arithmetic(_))));
        assert!(matches!(run(MathOp::Random, -1e308, 1e308), Err(ScriptError::Arithmetic(_))));
    }

    #[test]
    fn test_unary_ops() {
        assert_eq!(run(MathOp::Abs, -2.5, 0.0), Ok(2.5));
        assert_eq!(run(MathOp::Floor, 2.7, 0.0), Ok(2.0));
        assert_eq!(run(MathOp::Ceil, 2.1, 0.0), Ok(3.0));
        assert_eq!(run(MathOp::Sqrt, 9.0, 0.0), Ok(3.0));
    }
}
