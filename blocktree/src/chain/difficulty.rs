//! Compact difficulty-target codec.
//!
//! Raw difficulty values grow combinatorially across a long chain and
//! cannot be summed or compared with stable precision in fixed-width
//! integers. Each block's difficulty is therefore represented as a
//! natural logarithm relative to a fixed difficulty-1 reference target,
//! which turns multiplicative work accumulation into addition. The far
//! tail loses precision, which is acceptable because best-tip selection
//! orders on height first and cumulative log-difficulty second.

use crate::types::CompactTarget;

use super::error::ChainError;

/// Validates the mantissa of a compact target.
///
/// A zero mantissa encodes a zero target (log-difficulty would be
/// infinite) and a set sign bit encodes a negative target; both are
/// rejected before they can reach an accumulator.
fn checked_base(bits: CompactTarget) -> Result<f64, ChainError> {
    let base = bits.base();
    if base == 0 || base > 0x007f_ffff {
        return Err(ChainError::InvalidTarget(bits));
    }
    Ok(f64::from(base))
}

/// Computes the log-difficulty of a compact target relative to the
/// network's difficulty-1 reference target.
///
/// For a target `base * 256^(exponent - 3)` and a reference
/// `ref_base * 256^(ref_exponent - 3)` this is
/// `ln(ref_base) - ln(base) + ln(256) * (ref_exponent - exponent)`,
/// i.e. the logarithm of `reference_target / target`. The reference
/// target itself maps to exactly `0.0`.
pub fn log_difficulty(
    bits: CompactTarget,
    difficulty_1: CompactTarget,
) -> Result<f64, ChainError> {
    let base = checked_base(bits)?;
    let ref_base = checked_base(difficulty_1)?;

    let exponent_gap = f64::from(difficulty_1.exponent()) - f64::from(bits.exponent());
    Ok(ref_base.ln() - base.ln() + 256f64.ln() * exponent_gap)
}

/// Computes the conventional (linear-domain) difficulty of a target.
///
/// This is `exp(log_difficulty)` and exists for display and debugging
/// only; accumulation always happens in the log domain.
pub fn difficulty_of(
    bits: CompactTarget,
    difficulty_1: CompactTarget,
) -> Result<f64, ChainError> {
    log_difficulty(bits, difficulty_1).map(f64::exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFFICULTY_1: CompactTarget = CompactTarget(0x1d00ffff);

    #[test]
    fn reference_target_has_zero_log_difficulty() {
        let log = log_difficulty(DIFFICULTY_1, DIFFICULTY_1).expect("valid target");
        assert!(log.abs() < 1e-12);
        let diff = difficulty_of(DIFFICULTY_1, DIFFICULTY_1).expect("valid target");
        assert!((diff - 1.0).abs() < 1e-12);
    }

    #[test]
    fn classic_mainnet_target_matches_known_difficulty() {
        // 0x1b0404cb is the worked example from the Bitcoin wiki;
        // its difficulty is approximately 16307.42.
        let diff = difficulty_of(CompactTarget(0x1b0404cb), DIFFICULTY_1).expect("valid target");
        assert!((diff - 16307.420938523983).abs() / diff < 1e-9);
    }

    #[test]
    fn smaller_exponent_means_higher_difficulty() {
        let easy = log_difficulty(CompactTarget(0x1d00ffff), DIFFICULTY_1).unwrap();
        let hard = log_difficulty(CompactTarget(0x1c00ffff), DIFFICULTY_1).unwrap();

        // One exponent step is a factor of 256 in the target.
        assert!((hard - easy - 256f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn zero_mantissa_is_rejected() {
        let err = log_difficulty(CompactTarget(0x1d000000), DIFFICULTY_1).unwrap_err();
        match err {
            ChainError::InvalidTarget(bits) => assert_eq!(bits.to_bits(), 0x1d000000),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_mantissa_is_rejected() {
        // Sign bit of the 24-bit mantissa set: compact encoding of a
        // negative number, never a valid target.
        assert!(log_difficulty(CompactTarget(0x1d800000), DIFFICULTY_1).is_err());
    }

    #[test]
    fn log_difficulty_adds_where_difficulty_multiplies() {
        let a = CompactTarget(0x1c00ffff);
        let b = CompactTarget(0x1b00ffff);

        let log_sum = log_difficulty(a, DIFFICULTY_1).unwrap() + log_difficulty(b, DIFFICULTY_1).unwrap();
        let product =
            difficulty_of(a, DIFFICULTY_1).unwrap() * difficulty_of(b, DIFFICULTY_1).unwrap();

        assert!((log_sum.exp() - product).abs() / product < 1e-9);
    }
}
