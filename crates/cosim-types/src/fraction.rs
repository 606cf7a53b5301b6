//! Exact conversion between decimal clock values and fractions.
//!
//! Clock intervals and shifts are exchanged either as a decimal (`f64`) or as
//! a `counter / resolution` pair. The conversion from decimal to fraction is
//! exact: the decimal's shortest round-trip representation is parsed into a
//! fixed-point decimal, giving `numerator / 10^scale`, which is then reduced
//! by the greatest common divisor.
//!
//! For every decimal with a finite representation,
//! `fraction_to_decimal(decimal_to_fraction(x)) == x`.

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors converting between decimal and fractional clock values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("decimal value {0} is not finite")]
    NonFinite(f64),

    #[error("decimal value {0} has no exact fixed-point representation")]
    Unrepresentable(f64),

    #[error("fraction denominator must be positive")]
    ZeroDenominator,

    #[error("fraction component {0} does not fit in 64 bits")]
    Overflow(i128),

    #[error("negative value {0} cannot be expressed as an unsigned counter")]
    Negative(i64),
}

/// A reduced rational number: `gcd(numerator, denominator) == 1` and
/// `denominator > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    numerator: i64,
    denominator: u64,
}

impl Fraction {
    /// Creates a fraction in lowest terms.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cosim_types::Fraction;
    /// let f = Fraction::new(10, 8).unwrap();
    /// assert_eq!((f.numerator(), f.denominator()), (5, 4));
    /// ```
    pub fn new(numerator: i64, denominator: u64) -> Result<Self, ConversionError> {
        if denominator == 0 {
            return Err(ConversionError::ZeroDenominator);
        }
        reduce(i128::from(numerator), u128::from(denominator))
    }

    /// Creates a fraction from an unsigned `counter / resolution` pair, the
    /// form in which clocks exchange fractional values.
    pub fn from_counter(counter: u64, resolution: u64) -> Result<Self, ConversionError> {
        if resolution == 0 {
            return Err(ConversionError::ZeroDenominator);
        }
        reduce(i128::from(counter), u128::from(resolution))
    }

    pub fn numerator(self) -> i64 {
        self.numerator
    }

    pub fn denominator(self) -> u64 {
        self.denominator
    }

    /// The numerator as an unsigned clock counter.
    pub fn counter(self) -> Result<u64, ConversionError> {
        u64::try_from(self.numerator).map_err(|_| ConversionError::Negative(self.numerator))
    }

    /// The decimal equivalent of this fraction.
    pub fn to_decimal(self) -> f64 {
        // Both operands are exact below 2^53, and IEEE division rounds the
        // quotient to the nearest double.
        self.numerator as f64 / self.denominator as f64
    }
}

impl Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Converts a decimal into an exact, reduced fraction.
///
/// # Examples
///
/// ```
/// # use cosim_types::decimal_to_fraction;
/// let f = decimal_to_fraction(1.25).unwrap();
/// assert_eq!((f.numerator(), f.denominator()), (5, 4));
/// ```
pub fn decimal_to_fraction(value: f64) -> Result<Fraction, ConversionError> {
    if !value.is_finite() {
        return Err(ConversionError::NonFinite(value));
    }

    // `Display` for f64 yields the shortest digit string that parses back to
    // the same double, so the fixed-point value is exactly what the caller
    // wrote.
    let decimal = Decimal::from_str_exact(&value.to_string())
        .map_err(|_| ConversionError::Unrepresentable(value))?;

    let scale = decimal.scale();
    let denominator = 10u128.pow(scale);
    let numerator = decimal.mantissa();

    reduce(numerator, denominator)
}

/// Converts a fraction given as numerator and denominator into a decimal.
///
/// # Examples
///
/// ```
/// # use cosim_types::fraction_to_decimal;
/// assert_eq!(fraction_to_decimal(5, 4).unwrap(), 1.25);
/// ```
pub fn fraction_to_decimal(numerator: i64, denominator: u64) -> Result<f64, ConversionError> {
    Ok(Fraction::new(numerator, denominator)?.to_decimal())
}

fn reduce(numerator: i128, denominator: u128) -> Result<Fraction, ConversionError> {
    debug_assert!(denominator > 0, "denominator must be positive");

    let divisor = gcd(numerator.unsigned_abs(), denominator);
    // A zero numerator reduces to 0/1.
    let divisor = divisor.max(1);

    let reduced_denominator = denominator / divisor;
    let reduced_numerator = numerator / divisor as i128;

    let numerator = i64::try_from(reduced_numerator)
        .map_err(|_| ConversionError::Overflow(reduced_numerator))?;
    let denominator = u64::try_from(reduced_denominator)
        .map_err(|_| ConversionError::Overflow(reduced_denominator as i128))?;

    // Postcondition: lowest terms with a positive denominator.
    debug_assert!(denominator > 0);
    debug_assert_eq!(
        gcd(u128::from(numerator.unsigned_abs()), u128::from(denominator)).max(1),
        1
    );

    Ok(Fraction {
        numerator,
        denominator,
    })
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}
