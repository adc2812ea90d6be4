//! Arbitrary-precision decimal arithmetic.
//!
//! A [`Precise`] value is an integer mantissa scaled by a power of ten:
//! `integer × 10^-decimals`. Every operation is exact except division, which
//! truncates toward zero at a caller-chosen number of fractional digits.
//!
//! Fallible operations return [`PreciseError`]; division by zero is an error,
//! never a sentinel value.

use crate::error::PreciseError;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

/// Fractional digits kept by division when the caller does not choose.
pub const DEFAULT_DIVISION_PRECISION: u32 = 18;

/// Exact decimal value.
///
/// Equality, ordering and hashing are defined on the value, so `1.50` and
/// `1.5` are the same key.
///
/// ## Examples
///
/// ```
/// use book_delta::Precise;
///
/// let a: Precise = "0.1".parse().unwrap();
/// let b: Precise = "0.2".parse().unwrap();
/// assert_eq!(&a + &b, "0.3".parse::<Precise>().unwrap());
///
/// let third = Precise::from(1i64).checked_div(&Precise::from(3i64), 5).unwrap();
/// assert_eq!(third.to_string(), "0.33333");
/// ```
#[derive(Debug, Clone)]
pub struct Precise {
    integer: BigInt,
    decimals: i32,
}

/// Largest exponent magnitude accepted when parsing scientific notation.
const MAX_EXPONENT: i32 = 1_000;

fn pow10(exponent: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exponent as usize)
}

impl Precise {
    /// Creates a value from a mantissa and the number of decimal places it is
    /// scaled by. A negative `decimals` multiplies by a power of ten.
    pub fn new(integer: impl Into<BigInt>, decimals: i32) -> Self {
        Self {
            integer: integer.into(),
            decimals,
        }
    }

    /// The zero value.
    pub fn zero() -> Self {
        Self::new(BigInt::zero(), 0)
    }

    /// The raw mantissa.
    pub fn integer(&self) -> &BigInt {
        &self.integer
    }

    /// The raw decimal exponent.
    pub fn decimals(&self) -> i32 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.integer.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.integer.is_negative()
    }

    pub fn abs(&self) -> Self {
        Self::new(self.integer.abs(), self.decimals)
    }

    /// Strips trailing zero digits from the mantissa, adjusting the exponent.
    ///
    /// Zero always normalizes to `(0, 0)`.
    pub fn normalize(&self) -> Self {
        if self.integer.is_zero() {
            return Self::zero();
        }

        let ten = BigInt::from(10u8);
        let mut integer = self.integer.clone();
        let mut decimals = self.decimals;
        while (&integer % &ten).is_zero() {
            integer /= &ten;
            decimals -= 1;
        }

        Self { integer, decimals }
    }

    /// Divides by `other`, keeping `precision` fractional digits.
    ///
    /// The quotient truncates toward zero, for negative results too:
    /// `-1 / 3` at precision 2 is `-0.33`, not `-0.34`.
    ///
    /// ## Errors
    ///
    /// [`PreciseError::DivisionByZero`] when `other` is zero.
    pub fn checked_div(&self, other: &Self, precision: u32) -> Result<Self, PreciseError> {
        if other.integer.is_zero() {
            return Err(PreciseError::DivisionByZero);
        }

        let precision = i32::try_from(precision)
            .map_err(|_| PreciseError::OutOfRange(format!("precision {precision}")))?;
        let distance = precision - self.decimals + other.decimals;
        let numerator = if distance >= 0 {
            &self.integer * pow10(distance.unsigned_abs())
        } else {
            &self.integer / pow10(distance.unsigned_abs())
        };

        Ok(Self::new(numerator / &other.integer, precision))
    }

    /// Remainder of dividing by `other`; the sign follows `self`.
    ///
    /// ## Errors
    ///
    /// [`PreciseError::DivisionByZero`] when `other` is zero.
    pub fn checked_rem(&self, other: &Self) -> Result<Self, PreciseError> {
        if other.integer.is_zero() {
            return Err(PreciseError::DivisionByZero);
        }

        let numerator_scale = (other.decimals - self.decimals).max(0);
        let denominator_scale = (self.decimals - other.decimals).max(0);
        let numerator = &self.integer * pow10(numerator_scale.unsigned_abs());
        let denominator = &other.integer * pow10(denominator_scale.unsigned_abs());

        Ok(Self::new(
            numerator % denominator,
            denominator_scale + other.decimals,
        ))
    }

    fn sum_with(&self, other: &Self) -> Self {
        match self.decimals.cmp(&other.decimals) {
            Ordering::Equal => Self::new(&self.integer + &other.integer, self.decimals),
            Ordering::Less => {
                let scale = pow10((other.decimals - self.decimals).unsigned_abs());
                Self::new(&self.integer * scale + &other.integer, other.decimals)
            }
            Ordering::Greater => {
                let scale = pow10((self.decimals - other.decimals).unsigned_abs());
                Self::new(&self.integer + &other.integer * scale, self.decimals)
            }
        }
    }
}

// String helpers over decimal strings, as exchange payloads carry them.

fn parse_pair(a: &str, b: &str) -> Result<(Precise, Precise), PreciseError> {
    Ok((a.parse()?, b.parse()?))
}

impl Precise {
    pub fn string_add(a: &str, b: &str) -> Result<String, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok((a + b).to_string())
    }

    pub fn string_sub(a: &str, b: &str) -> Result<String, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok((a - b).to_string())
    }

    pub fn string_mul(a: &str, b: &str) -> Result<String, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok((a * b).to_string())
    }

    /// Divides with [`DEFAULT_DIVISION_PRECISION`] fractional digits.
    pub fn string_div(a: &str, b: &str) -> Result<String, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a.checked_div(&b, DEFAULT_DIVISION_PRECISION)?.to_string())
    }

    pub fn string_rem(a: &str, b: &str) -> Result<String, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a.checked_rem(&b)?.to_string())
    }

    pub fn string_abs(a: &str) -> Result<String, PreciseError> {
        Ok(a.parse::<Precise>()?.abs().to_string())
    }

    pub fn string_neg(a: &str) -> Result<String, PreciseError> {
        Ok((-a.parse::<Precise>()?).to_string())
    }

    pub fn string_min(a: &str, b: &str) -> Result<String, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a.min(b).to_string())
    }

    pub fn string_max(a: &str, b: &str) -> Result<String, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a.max(b).to_string())
    }

    pub fn string_eq(a: &str, b: &str) -> Result<bool, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a == b)
    }

    pub fn string_gt(a: &str, b: &str) -> Result<bool, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a > b)
    }

    pub fn string_ge(a: &str, b: &str) -> Result<bool, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a >= b)
    }

    pub fn string_lt(a: &str, b: &str) -> Result<bool, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a < b)
    }

    pub fn string_le(a: &str, b: &str) -> Result<bool, PreciseError> {
        let (a, b) = parse_pair(a, b)?;
        Ok(a <= b)
    }
}

impl FromStr for Precise {
    type Err = PreciseError;

    /// Parses `[-+]digits[.digits][(e|E)[-+]digits]`, with an exponent of at
    /// most 1000 in magnitude.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || PreciseError::Parse(input.to_string());

        let lowered = input.to_ascii_lowercase();
        let (body, exponent) = match lowered.split_once('e') {
            Some((body, exponent)) => (body, exponent.parse::<i32>().map_err(|_| invalid())?),
            None => (lowered.as_str(), 0),
        };
        if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
            return Err(invalid());
        }

        let (negative, unsigned) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body.strip_prefix('+').unwrap_or(body)),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = whole
            .bytes()
            .chain(fraction.bytes())
            .all(|byte| byte.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits {
            return Err(invalid());
        }

        let mut integer: BigInt = format!("{whole}{fraction}")
            .parse()
            .map_err(|_| invalid())?;
        if negative {
            integer = -integer;
        }

        let decimals = i32::try_from(fraction.len())
            .ok()
            .and_then(|digits| digits.checked_sub(exponent))
            .ok_or_else(invalid)?;

        Ok(Self::new(integer, decimals))
    }
}

impl fmt::Display for Precise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reduced = self.normalize();
        let sign = if reduced.integer.is_negative() { "-" } else { "" };
        let digits = reduced.integer.magnitude().to_string();

        let rendered = match reduced.decimals.cmp(&0) {
            Ordering::Less => {
                format!("{digits}{}", "0".repeat(reduced.decimals.unsigned_abs() as usize))
            }
            Ordering::Equal => digits,
            Ordering::Greater => {
                let width = reduced.decimals.unsigned_abs() as usize;
                let padded = format!("{digits:0>width$}");
                let split = padded.len() - width;
                if split == 0 {
                    format!("0.{padded}")
                } else {
                    format!("{}.{}", &padded[..split], &padded[split..])
                }
            }
        };

        write!(f, "{sign}{rendered}")
    }
}

impl PartialEq for Precise {
    fn eq(&self, other: &Self) -> bool {
        let (left, right) = (self.normalize(), other.normalize());
        left.decimals == right.decimals && left.integer == right.integer
    }
}

impl Eq for Precise {}

impl Hash for Precise {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let reduced = self.normalize();
        reduced.integer.hash(state);
        reduced.decimals.hash(state);
    }
}

impl PartialOrd for Precise {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Precise {
    fn cmp(&self, other: &Self) -> Ordering {
        (self - other).integer.sign().cmp(&num_bigint::Sign::NoSign)
    }
}

impl Neg for &Precise {
    type Output = Precise;

    fn neg(self) -> Precise {
        Precise::new(-&self.integer, self.decimals)
    }
}

impl Neg for Precise {
    type Output = Precise;

    fn neg(self) -> Precise {
        Precise::new(-self.integer, self.decimals)
    }
}

impl<'a> Add<&'a Precise> for &'a Precise {
    type Output = Precise;

    fn add(self, other: &'a Precise) -> Precise {
        self.sum_with(other)
    }
}

impl<'a> Sub<&'a Precise> for &'a Precise {
    type Output = Precise;

    fn sub(self, other: &'a Precise) -> Precise {
        self.sum_with(&-other)
    }
}

impl<'a> Mul<&'a Precise> for &'a Precise {
    type Output = Precise;

    fn mul(self, other: &'a Precise) -> Precise {
        Precise::new(&self.integer * &other.integer, self.decimals + other.decimals)
    }
}

macro_rules! forward_owned_binop {
    ($trait:ident, $method:ident) => {
        impl $trait<Precise> for Precise {
            type Output = Precise;

            fn $method(self, other: Precise) -> Precise {
                (&self).$method(&other)
            }
        }
    };
}

forward_owned_binop!(Add, add);
forward_owned_binop!(Sub, sub);
forward_owned_binop!(Mul, mul);

impl Sum for Precise {
    fn sum<I: Iterator<Item = Precise>>(iter: I) -> Self {
        iter.fold(Precise::zero(), |total, value| &total + &value)
    }
}

impl From<i64> for Precise {
    fn from(value: i64) -> Self {
        Self::new(value, 0)
    }
}

impl From<u64> for Precise {
    fn from(value: u64) -> Self {
        Self::new(value, 0)
    }
}

impl From<Decimal> for Precise {
    fn from(value: Decimal) -> Self {
        // Decimal scales are bounded by 28, well inside i32.
        Self::new(value.mantissa(), value.scale() as i32)
    }
}

impl TryFrom<&Precise> for Decimal {
    type Error = PreciseError;

    fn try_from(value: &Precise) -> Result<Self, Self::Error> {
        let out_of_range = || PreciseError::OutOfRange(value.to_string());

        let reduced = value.normalize();
        let (integer, scale) = if reduced.decimals < 0 {
            (reduced.integer * pow10(reduced.decimals.unsigned_abs()), 0)
        } else {
            (reduced.integer, reduced.decimals.unsigned_abs())
        };

        let mantissa = integer.to_i128().ok_or_else(out_of_range)?;
        Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| out_of_range())
    }
}

impl TryFrom<Precise> for Decimal {
    type Error = PreciseError;

    fn try_from(value: Precise) -> Result<Self, Self::Error> {
        Decimal::try_from(&value)
    }
}
