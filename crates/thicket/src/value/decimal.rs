//! Exact decimal numbers (`1.50M`)

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use num_bigint::{BigInt, Sign};

/// Fractional digits kept by division before trailing zeros are stripped.
const DIVISION_SCALE: u32 = 16;

/// An arbitrary-precision decimal: `unscaled * 10^-scale`.
///
/// Equality and ordering are numeric, so `1.0M` equals `1.00M`; the scale
/// is preserved for printing.
#[derive(Clone)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

fn pow10(n: u32) -> BigInt {
    BigInt::from(10u32).pow(n)
}

fn is_zero(n: &BigInt) -> bool {
    n.sign() == Sign::NoSign
}

impl Decimal {
    /// Create from an unscaled integer and scale.
    pub fn new(unscaled: BigInt, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    /// Create from an integer with scale 0.
    pub fn from_i64(n: i64) -> Self {
        Self::new(BigInt::from(n), 0)
    }

    /// Parse decimal digits such as `-12.340` (no exponent, no marker).
    pub fn parse(text: &str) -> Option<Self> {
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };
        if frac_part.contains(|c: char| !c.is_ascii_digit()) {
            return None;
        }
        let digits = format!("{}{}", int_part, frac_part);
        let unscaled = digits.parse::<BigInt>().ok()?;
        Some(Self::new(unscaled, frac_part.len() as u32))
    }

    /// Convert from a float through its shortest decimal representation.
    pub fn from_f64(f: f64) -> Option<Self> {
        if !f.is_finite() {
            return None;
        }
        Self::parse(&format!("{:?}", f))
    }

    /// The number of fractional digits.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        is_zero(&self.unscaled)
    }

    fn rescaled(&self, scale: u32) -> BigInt {
        if scale <= self.scale {
            self.unscaled.clone()
        } else {
            &self.unscaled * pow10(scale - self.scale)
        }
    }

    /// Remove trailing fractional zeros.
    pub fn normalized(&self) -> Self {
        let ten = BigInt::from(10u32);
        let mut unscaled = self.unscaled.clone();
        let mut scale = self.scale;
        while scale > 0 && !is_zero(&unscaled) && is_zero(&(&unscaled % &ten)) {
            unscaled /= &ten;
            scale -= 1;
        }
        if is_zero(&unscaled) {
            scale = 0;
        }
        Self::new(unscaled, scale)
    }

    /// Exact sum.
    pub fn add(&self, other: &Decimal) -> Decimal {
        let scale = self.scale.max(other.scale);
        Decimal::new(self.rescaled(scale) + other.rescaled(scale), scale)
    }

    /// Exact difference.
    pub fn sub(&self, other: &Decimal) -> Decimal {
        let scale = self.scale.max(other.scale);
        Decimal::new(self.rescaled(scale) - other.rescaled(scale), scale)
    }

    /// Exact product.
    pub fn mul(&self, other: &Decimal) -> Decimal {
        Decimal::new(&self.unscaled * &other.unscaled, self.scale + other.scale)
    }

    /// Quotient rounded half-up, or `None` when dividing by zero.
    pub fn div(&self, other: &Decimal) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        let keep = self.scale.max(other.scale);
        let target = keep.max(DIVISION_SCALE);
        // self / other = (a * 10^(target + other.scale + 1)) / (b * 10^self.scale) * 10^-(target+1)
        let numerator = &self.unscaled * pow10(target + other.scale + 1);
        let denominator = &other.unscaled * pow10(self.scale);
        let raw = numerator / denominator;
        let ten = BigInt::from(10u32);
        let last = &raw % &ten;
        let mut rounded = &raw / &ten;
        if last >= BigInt::from(5) {
            rounded += 1;
        } else if last <= BigInt::from(-5) {
            rounded -= 1;
        }
        let mut result = Decimal::new(rounded, target).normalized();
        if result.scale < keep {
            result = Decimal::new(result.rescaled(keep), keep);
        }
        Some(result)
    }

    /// Negation.
    pub fn neg(&self) -> Decimal {
        Decimal::new(-self.unscaled.clone(), self.scale)
    }

    /// Nearest float.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Truncate towards zero, if the result fits in an `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        let whole = &self.unscaled / pow10(self.scale);
        i64::try_from(&whole).ok()
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.rescaled(scale).cmp(&other.rescaled(scale))
    }
}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let n = self.normalized();
        n.unscaled.hash(state);
        n.scale.hash(state);
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.unscaled.sign() == Sign::Minus;
        let digits = self.unscaled.magnitude().to_string();
        let scale = self.scale as usize;
        let sign = if negative { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}M", self)
    }
}
