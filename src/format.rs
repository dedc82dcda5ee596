//! Numeric-to-text conversion for published numbers and numeric producers.
//!
//! The recorder never stores floating point values; every number is turned into
//! text by a `NumberFormat` the moment it enters the recorder. The format can be
//! replaced at any time and the replacement applies to all later conversions,
//! including those of numeric producers registered before the change.

use std::fmt;
use std::sync::Arc;

/// Default number of significant digits.
pub const DEFAULT_SIGNIFICANT_DIGITS: usize = 5;

/// Largest number of significant digits an `f64` carries.
pub const MAX_SIGNIFICANT_DIGITS: usize = 17;

type FormatFn = dyn Fn(f64) -> String + Send + Sync;

/// A replaceable function from `f64` to its textual representation.
#[derive(Clone)]
pub struct NumberFormat {
    inner: Arc<FormatFn>,
    label: String,
}

impl NumberFormat {
    /// Formats with `digits` significant digits, `%g` style.
    ///
    /// Values whose decimal exponent `e` satisfies `-4 <= e < digits` are written
    /// in fixed notation (`98.600`), everything else in scientific notation with a
    /// signed exponent of at least two digits (`1.2346e+05`). Trailing zeros are
    /// kept. `digits` is clamped to `1..=MAX_SIGNIFICANT_DIGITS`.
    pub fn significant(digits: usize) -> Self {
        let digits = digits.clamp(1, MAX_SIGNIFICANT_DIGITS);
        Self {
            inner: Arc::new(move |value| format_significant(value, digits)),
            label: format!("significant({digits})"),
        }
    }

    /// Wraps an arbitrary conversion function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> String + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(f),
            label: "custom".to_string(),
        }
    }

    /// Converts a number to text.
    pub fn format(&self, value: f64) -> String {
        (self.inner)(value)
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::significant(DEFAULT_SIGNIFICANT_DIGITS)
    }
}

impl fmt::Debug for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NumberFormat").field(&self.label).finish()
    }
}

fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return format!("{:.*}", digits - 1, value);
    }

    // Round once in scientific form; the exponent of the rounded value decides
    // the notation, so 99999.7 becomes 1.0000e+05 rather than 100000.
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent >= -4 && exponent < digits as i32 {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, value)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fixed_notation() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(98.6), "98.600");
        assert_eq!(fmt.format(-1.0), "-1.0000");
        assert_eq!(fmt.format(0.5), "0.50000");
        assert_eq!(fmt.format(12345.0), "12345");
        assert_eq!(fmt.format(0.0), "0.0000");
    }

    #[test]
    fn test_default_scientific_notation() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(123456.0), "1.2346e+05");
        assert_eq!(fmt.format(0.00001234), "1.2340e-05");
        assert_eq!(fmt.format(-6.02e23), "-6.0200e+23");
    }

    #[test]
    fn test_rounding_carries_into_exponent() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(99999.7), "1.0000e+05");
        assert_eq!(fmt.format(0.0001), "0.00010000");
    }

    #[test]
    fn test_non_finite_values() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(f64::NAN), "NaN");
        assert_eq!(fmt.format(f64::INFINITY), "Infinity");
        assert_eq!(fmt.format(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_other_precisions() {
        assert_eq!(NumberFormat::significant(3).format(1.23456), "1.23");
        assert_eq!(NumberFormat::significant(1).format(7.0), "7");
        assert_eq!(NumberFormat::significant(0).format(7.0), "7");
    }

    #[test]
    fn test_precision_clamped_to_f64_digits() {
        let widest = NumberFormat::significant(usize::MAX);
        assert_eq!(format!("{widest:?}"), "NumberFormat(\"significant(17)\")");
        assert_eq!(widest.format(1.0), "1.0000000000000000");
    }

    #[test]
    fn test_custom_format() {
        let fmt = NumberFormat::custom(|v| format!("{v:.1}"));
        assert_eq!(fmt.format(2.0), "2.0");
        assert_eq!(format!("{fmt:?}"), "NumberFormat(\"custom\")");
    }
}
