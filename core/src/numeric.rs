use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt as BigInteger;
use num_rational::BigRational;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::error::{Error, Result};

/// Largest power of ten a BigFloat parsed from text may carry. Exact
/// conversions materialize `10^scale`, so unbounded exponents are refused.
pub const MAX_DECIMAL_SCALE: i64 = 10_000;

// ============================================================================
// Numeric Type System
// ============================================================================

#[derive(Debug, Clone)]
pub enum NumericType {
    /// Fixed-width integer. Plain arithmetic wraps on overflow.
    Int(i64),

    /// Arbitrary precision integer
    BigInt(Rc<BigInteger>),

    /// Exact rational number, always in lowest terms with a denominator > 1
    Ratio(Rc<BigRational>),

    /// Arbitrary precision decimal
    BigFloat(Rc<BigDecimal>),

    /// IEEE 754 double precision floating point
    Float(f64),
}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NumericType::Int(n) => write!(f, "{n}"),
            NumericType::BigInt(n) => write!(f, "{n}N"),
            NumericType::Ratio(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            NumericType::BigFloat(d) => write!(f, "{d}M"),
            NumericType::Float(x) => {
                if x.is_nan() {
                    write!(f, "##NaN")
                } else if x.is_infinite() {
                    let sign = if *x > 0.0 { "##Inf" } else { "##-Inf" };
                    write!(f, "{sign}")
                } else {
                    write!(f, "{x:?}")
                }
            }
        }
    }
}

// ============================================================================
// Equality
// ============================================================================

/// Numbers compare by mathematical value through the resolved table, so
/// `1`, `1N` and `1.0` are all equal.
impl PartialEq for NumericType {
    fn eq(&self, other: &Self) -> bool {
        Ops::resolve(self, other).eq(self, other)
    }
}

// ============================================================================
// Construction and Conversion
// ============================================================================

impl NumericType {
    pub fn bigint(n: BigInteger) -> NumericType {
        NumericType::BigInt(Rc::new(n))
    }

    pub fn bigfloat(d: BigDecimal) -> NumericType {
        NumericType::BigFloat(Rc::new(d))
    }

    /// Parse decimal text such as `1.5` or `2E-3`; `None` when it is not a
    /// decimal or its exponent exceeds [`MAX_DECIMAL_SCALE`]
    pub fn parse_bigfloat(text: &str) -> Option<NumericType> {
        let d = BigDecimal::from_str(text).ok()?;
        let (_, scale) = d.as_bigint_and_exponent();
        (scale.abs() <= MAX_DECIMAL_SCALE).then(|| NumericType::bigfloat(d))
    }

    /// Narrow an arbitrary precision integer to `Int` when it fits
    pub fn integer(n: BigInteger) -> NumericType {
        match n.to_i64() {
            Some(i) => NumericType::Int(i),
            None => NumericType::bigint(n),
        }
    }

    /// Build a ratio in lowest terms; integral results become integers
    pub fn from_ratio(r: BigRational) -> NumericType {
        if r.is_integer() {
            NumericType::integer(r.to_integer())
        } else {
            NumericType::Ratio(Rc::new(r))
        }
    }

    /// Create a ratio in reduced form
    pub fn make_ratio(num: i64, denom: i64) -> Result<NumericType> {
        Self::make_big_ratio(BigInteger::from(num), BigInteger::from(denom))
    }

    pub fn make_big_ratio(num: BigInteger, denom: BigInteger) -> Result<NumericType> {
        if denom.is_zero() {
            return Err(Error::arithmetic("Divide by zero"));
        }
        Ok(Self::from_ratio(BigRational::new(num, denom)))
    }

    /// Convert to float (may lose precision)
    pub fn to_f64(&self) -> f64 {
        match self {
            NumericType::Int(n) => *n as f64,
            NumericType::BigInt(n) => n.to_f64().unwrap_or(if n.is_negative() {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }),
            NumericType::Ratio(r) => r.to_f64().unwrap_or(f64::NAN),
            NumericType::BigFloat(d) => d.to_f64().unwrap_or(f64::NAN),
            NumericType::Float(x) => *x,
        }
    }

    /// Truncate to a fixed-width integer, keeping the low 64 bits of
    /// values that do not fit
    pub fn to_int(&self) -> i64 {
        match self {
            NumericType::Int(n) => *n,
            NumericType::Float(x) => *x as i64,
            other => {
                let n = other.to_bigint();
                n.to_i64().unwrap_or_else(|| {
                    let low = n & BigInteger::from(u64::MAX);
                    low.to_u64().unwrap_or(0) as i64
                })
            }
        }
    }

    /// Truncate toward zero to an arbitrary precision integer
    pub fn to_bigint(&self) -> BigInteger {
        match self {
            NumericType::Int(n) => BigInteger::from(*n),
            NumericType::BigInt(n) => n.as_ref().clone(),
            NumericType::Ratio(r) => r.to_integer(),
            NumericType::BigFloat(d) => d.with_scale(0).as_bigint_and_exponent().0,
            NumericType::Float(x) => BigInteger::from_f64(x.trunc()).unwrap_or_else(BigInteger::zero),
        }
    }

    pub fn to_ratio(&self) -> BigRational {
        match self {
            NumericType::Int(n) => BigRational::from_integer(BigInteger::from(*n)),
            NumericType::BigInt(n) => BigRational::from_integer(n.as_ref().clone()),
            NumericType::Ratio(r) => r.as_ref().clone(),
            NumericType::BigFloat(d) => {
                let (digits, scale) = d.as_bigint_and_exponent();
                let ten = BigInteger::from(10);
                if scale >= 0 {
                    BigRational::new(digits, num_traits::pow(ten, scale as usize))
                } else {
                    BigRational::from_integer(digits * num_traits::pow(ten, (-scale) as usize))
                }
            }
            NumericType::Float(x) => BigRational::from_float(*x).unwrap_or_else(BigRational::zero),
        }
    }

    pub fn to_bigdecimal(&self) -> BigDecimal {
        match self {
            NumericType::Int(n) => BigDecimal::from(*n),
            NumericType::BigInt(n) => BigDecimal::new(n.as_ref().clone(), 0),
            NumericType::Ratio(r) => {
                BigDecimal::new(r.numer().clone(), 0) / BigDecimal::new(r.denom().clone(), 0)
            }
            NumericType::BigFloat(d) => d.as_ref().clone(),
            NumericType::Float(x) => BigDecimal::from_f64(*x).unwrap_or_else(BigDecimal::zero),
        }
    }

    /// Check if number is zero
    pub fn is_zero(&self) -> bool {
        match self {
            NumericType::Int(n) => *n == 0,
            NumericType::BigInt(n) => n.is_zero(),
            NumericType::Ratio(r) => r.is_zero(),
            NumericType::BigFloat(d) => d.is_zero(),
            NumericType::Float(x) => *x == 0.0,
        }
    }

    pub fn is_pos(&self) -> bool {
        Ops::of(self).gt(self, &NumericType::Int(0))
    }

    pub fn is_neg(&self) -> bool {
        Ops::of(self).lt(self, &NumericType::Int(0))
    }
}

// ============================================================================
// Operation Tables
// ============================================================================

/// An arithmetic/comparison table for one numeric kind.
///
/// Tables form a total order, `Int < BigInt < Ratio < BigFloat < Float`, and
/// [`Ops::combine`] picks the larger of two. The combination is therefore
/// commutative and associative, and a float operand always selects the float
/// table, even against arbitrary precision values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ops {
    Int,
    BigInt,
    Ratio,
    BigFloat,
    Float,
}

impl Ops {
    /// The table for a single number's kind
    pub fn of(n: &NumericType) -> Ops {
        match n {
            NumericType::Int(_) => Ops::Int,
            NumericType::BigInt(_) => Ops::BigInt,
            NumericType::Ratio(_) => Ops::Ratio,
            NumericType::BigFloat(_) => Ops::BigFloat,
            NumericType::Float(_) => Ops::Float,
        }
    }

    pub fn combine(self, other: Ops) -> Ops {
        self.max(other)
    }

    /// The table whose domain covers both operands
    pub fn resolve(a: &NumericType, b: &NumericType) -> Ops {
        Ops::of(a).combine(Ops::of(b))
    }

    /// The table used by the overflow-promoting family (`add'`, `inc'`, ...)
    pub fn resolve_extended(a: &NumericType, b: &NumericType) -> Ops {
        Ops::resolve(a, b).combine(Ops::BigInt)
    }

    pub fn add(self, a: &NumericType, b: &NumericType) -> NumericType {
        match self {
            Ops::Int => NumericType::Int(a.to_int().wrapping_add(b.to_int())),
            Ops::BigInt => NumericType::bigint(a.to_bigint() + b.to_bigint()),
            Ops::Ratio => NumericType::from_ratio(a.to_ratio() + b.to_ratio()),
            Ops::BigFloat => NumericType::bigfloat(a.to_bigdecimal() + b.to_bigdecimal()),
            Ops::Float => NumericType::Float(a.to_f64() + b.to_f64()),
        }
    }

    pub fn subtract(self, a: &NumericType, b: &NumericType) -> NumericType {
        match self {
            Ops::Int => NumericType::Int(a.to_int().wrapping_sub(b.to_int())),
            Ops::BigInt => NumericType::bigint(a.to_bigint() - b.to_bigint()),
            Ops::Ratio => NumericType::from_ratio(a.to_ratio() - b.to_ratio()),
            Ops::BigFloat => NumericType::bigfloat(a.to_bigdecimal() - b.to_bigdecimal()),
            Ops::Float => NumericType::Float(a.to_f64() - b.to_f64()),
        }
    }

    pub fn multiply(self, a: &NumericType, b: &NumericType) -> NumericType {
        match self {
            Ops::Int => NumericType::Int(a.to_int().wrapping_mul(b.to_int())),
            Ops::BigInt => NumericType::bigint(a.to_bigint() * b.to_bigint()),
            Ops::Ratio => NumericType::from_ratio(a.to_ratio() * b.to_ratio()),
            Ops::BigFloat => NumericType::bigfloat(a.to_bigdecimal() * b.to_bigdecimal()),
            Ops::Float => NumericType::Float(a.to_f64() * b.to_f64()),
        }
    }

    /// Division. Exact operands give an integer when evenly divisible and a
    /// ratio otherwise; float division follows IEEE 754.
    pub fn divide(self, a: &NumericType, b: &NumericType) -> Result<NumericType> {
        match self {
            Ops::Float => Ok(NumericType::Float(a.to_f64() / b.to_f64())),
            _ if b.is_zero() => Err(Error::arithmetic("Divide by zero")),
            Ops::Int => {
                let (x, y) = (a.to_int(), b.to_int());
                if x.wrapping_rem(y) == 0 {
                    Ok(NumericType::Int(x.wrapping_div(y)))
                } else {
                    NumericType::make_ratio(x, y)
                }
            }
            Ops::BigInt => {
                let r = BigRational::new(a.to_bigint(), b.to_bigint());
                if r.is_integer() {
                    Ok(NumericType::bigint(r.to_integer()))
                } else {
                    Ok(NumericType::Ratio(Rc::new(r)))
                }
            }
            Ops::Ratio => Ok(NumericType::from_ratio(a.to_ratio() / b.to_ratio())),
            Ops::BigFloat => Ok(NumericType::bigfloat(
                a.to_bigdecimal() / b.to_bigdecimal(),
            )),
        }
    }

    /// Quotient truncated toward zero
    pub fn quotient(self, a: &NumericType, b: &NumericType) -> Result<NumericType> {
        if b.is_zero() {
            return Err(Error::arithmetic("Divide by zero"));
        }
        Ok(match self {
            Ops::Int => NumericType::Int(a.to_int().wrapping_div(b.to_int())),
            Ops::BigInt => NumericType::bigint(a.to_bigint() / b.to_bigint()),
            Ops::Ratio => NumericType::integer((a.to_ratio() / b.to_ratio()).to_integer()),
            Ops::BigFloat => {
                NumericType::bigfloat((a.to_bigdecimal() / b.to_bigdecimal()).with_scale(0))
            }
            Ops::Float => NumericType::Float((a.to_f64() / b.to_f64()).trunc()),
        })
    }

    /// Remainder with the sign of the dividend
    pub fn remainder(self, a: &NumericType, b: &NumericType) -> Result<NumericType> {
        if b.is_zero() {
            return Err(Error::arithmetic("Divide by zero"));
        }
        Ok(match self {
            Ops::Int => NumericType::Int(a.to_int().wrapping_rem(b.to_int())),
            Ops::BigInt => NumericType::bigint(a.to_bigint() % b.to_bigint()),
            Ops::Ratio => {
                let (x, y) = (a.to_ratio(), b.to_ratio());
                let q = BigRational::from_integer((&x / &y).to_integer());
                NumericType::from_ratio(x - y * q)
            }
            Ops::BigFloat => {
                let (x, y) = (a.to_bigdecimal(), b.to_bigdecimal());
                let q = (&x / &y).with_scale(0);
                NumericType::bigfloat(x - y * q)
            }
            Ops::Float => NumericType::Float(a.to_f64() % b.to_f64()),
        })
    }

    /// Total comparison used by `compare` and sorting. NaN compares equal
    /// to everything.
    pub fn compare(self, a: &NumericType, b: &NumericType) -> Ordering {
        match self {
            Ops::Int => a.to_int().cmp(&b.to_int()),
            Ops::BigInt => a.to_bigint().cmp(&b.to_bigint()),
            Ops::Ratio => a.to_ratio().cmp(&b.to_ratio()),
            Ops::BigFloat => a.to_bigdecimal().cmp(&b.to_bigdecimal()),
            Ops::Float => a
                .to_f64()
                .partial_cmp(&b.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }

    pub fn lt(self, a: &NumericType, b: &NumericType) -> bool {
        match self {
            Ops::Float => a.to_f64() < b.to_f64(),
            _ => self.compare(a, b) == Ordering::Less,
        }
    }

    pub fn lte(self, a: &NumericType, b: &NumericType) -> bool {
        match self {
            Ops::Float => a.to_f64() <= b.to_f64(),
            _ => self.compare(a, b) != Ordering::Greater,
        }
    }

    pub fn gt(self, a: &NumericType, b: &NumericType) -> bool {
        match self {
            Ops::Float => a.to_f64() > b.to_f64(),
            _ => self.compare(a, b) == Ordering::Greater,
        }
    }

    pub fn gte(self, a: &NumericType, b: &NumericType) -> bool {
        match self {
            Ops::Float => a.to_f64() >= b.to_f64(),
            _ => self.compare(a, b) != Ordering::Less,
        }
    }

    pub fn eq(self, a: &NumericType, b: &NumericType) -> bool {
        match self {
            Ops::Float => a.to_f64() == b.to_f64(),
            _ => self.compare(a, b) == Ordering::Equal,
        }
    }
}

/// The larger of two numbers, keeping the original operand
pub fn max(a: &NumericType, b: &NumericType) -> NumericType {
    if Ops::resolve(a, b).gte(a, b) {
        a.clone()
    } else {
        b.clone()
    }
}

/// The smaller of two numbers, keeping the original operand
pub fn min(a: &NumericType, b: &NumericType) -> NumericType {
    if Ops::resolve(a, b).lte(a, b) {
        a.clone()
    } else {
        b.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn big(s: &str) -> NumericType {
        NumericType::bigint(BigInteger::from_str(s).unwrap())
    }

    fn dec(s: &str) -> NumericType {
        NumericType::bigfloat(BigDecimal::from_str(s).unwrap())
    }

    #[test]
    fn test_parse_bigfloat_bounds_exponent() {
        assert!(matches!(
            NumericType::parse_bigfloat("2.5E-3"),
            Some(NumericType::BigFloat(_))
        ));
        assert!(NumericType::parse_bigfloat("1E10000").is_some());
        assert!(NumericType::parse_bigfloat("1E-999999999").is_none());
        assert!(NumericType::parse_bigfloat("1E999999999").is_none());
        assert!(NumericType::parse_bigfloat("abc").is_none());
    }

    #[test]
    fn test_int_arithmetic() {
        let a = NumericType::Int(5);
        let b = NumericType::Int(3);
        let ops = Ops::resolve(&a, &b);

        assert_eq!(ops, Ops::Int);
        assert!(matches!(ops.add(&a, &b), NumericType::Int(8)));
        assert!(matches!(ops.subtract(&a, &b), NumericType::Int(2)));
        assert!(matches!(ops.multiply(&a, &b), NumericType::Int(15)));
    }

    #[test]
    fn test_plain_int_wraps() {
        let a = NumericType::Int(i64::MAX);
        let b = NumericType::Int(1);

        match Ops::resolve(&a, &b).add(&a, &b) {
            NumericType::Int(n) => assert_eq!(n, i64::MIN),
            other => panic!("Expected wrapped Int, got {other:?}"),
        }
    }

    #[test]
    fn test_extended_promotes() {
        let a = NumericType::Int(i64::MAX);
        let b = NumericType::Int(1);

        match Ops::resolve_extended(&a, &b).add(&a, &b) {
            NumericType::BigInt(n) => assert_eq!(n.to_string(), "9223372036854775808"),
            other => panic!("Expected BigInt, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_division() {
        let five = NumericType::Int(5);
        let two = NumericType::Int(2);
        let six = NumericType::Int(6);

        let q = Ops::Int.divide(&five, &two).unwrap();
        assert!(matches!(q, NumericType::Ratio(_)));
        assert_eq!(q.to_string(), "5/2");

        assert!(matches!(
            Ops::Int.divide(&six, &two).unwrap(),
            NumericType::Int(3)
        ));
    }

    #[test]
    fn test_ratio_reduction() {
        let r = NumericType::make_ratio(6, 9).unwrap();
        assert_eq!(r.to_string(), "2/3");

        let r2 = NumericType::make_ratio(10, 5).unwrap();
        assert!(matches!(r2, NumericType::Int(2)));

        let r3 = NumericType::make_ratio(1, -2).unwrap();
        assert_eq!(r3.to_string(), "-1/2");
    }

    #[test]
    fn test_ratio_arithmetic() {
        let a = NumericType::make_ratio(1, 2).unwrap();
        let b = NumericType::make_ratio(1, 3).unwrap();
        let ops = Ops::resolve(&a, &b);

        assert_eq!(ops.add(&a, &b).to_string(), "5/6");
        assert_eq!(ops.multiply(&a, &b).to_string(), "1/6");
        // 1/2 + 1/2 collapses back to an Int
        assert!(matches!(ops.add(&a, &a), NumericType::Int(1)));
    }

    #[test]
    fn test_division_by_zero() {
        let a = NumericType::Int(5);
        let zero = NumericType::Int(0);

        for ops in [Ops::Int, Ops::BigInt, Ops::Ratio, Ops::BigFloat] {
            assert!(matches!(
                ops.divide(&a, &zero),
                Err(Error::Arithmetic(_))
            ));
        }
        assert!(Ops::Int.quotient(&a, &zero).is_err());
        assert!(Ops::Int.remainder(&a, &zero).is_err());
    }

    #[test]
    fn test_float_division_by_zero_is_ieee() {
        let a = NumericType::Float(1.0);
        let zero = NumericType::Int(0);
        let ops = Ops::resolve(&a, &zero);
        match ops.divide(&a, &zero).unwrap() {
            NumericType::Float(x) => assert!(x.is_infinite()),
            other => panic!("Expected Float, got {other:?}"),
        }
    }

    #[test]
    fn test_float_dominates_big_values() {
        // Precision loss is accepted: a float operand always picks the float table.
        let huge = big("100000000000000000000000000000001");
        let one = NumericType::Float(1.0);
        assert_eq!(Ops::resolve(&huge, &one), Ops::Float);
        assert!(matches!(
            Ops::resolve(&huge, &one).add(&huge, &one),
            NumericType::Float(_)
        ));
        assert_eq!(Ops::resolve(&dec("1.5"), &one), Ops::Float);
    }

    #[test]
    fn test_lattice_combinations() {
        let i = NumericType::Int(1);
        let b = big("1");
        let r = NumericType::make_ratio(1, 2).unwrap();
        let d = dec("0.5");
        assert_eq!(Ops::resolve(&i, &b), Ops::BigInt);
        assert_eq!(Ops::resolve(&i, &r), Ops::Ratio);
        assert_eq!(Ops::resolve(&b, &r), Ops::Ratio);
        assert_eq!(Ops::resolve(&r, &d), Ops::BigFloat);
        assert_eq!(Ops::resolve(&d, &i), Ops::BigFloat);
    }

    #[test]
    fn test_cross_type_comparison() {
        let int_five = NumericType::Int(5);
        let big_five = big("5");
        let float_five = NumericType::Float(5.0);
        let dec_five = dec("5.00");

        assert_eq!(int_five, big_five);
        assert_eq!(int_five, float_five);
        assert_eq!(big_five, dec_five);
        assert!(Ops::Ratio.lt(&NumericType::make_ratio(1, 3).unwrap(), &int_five));
    }

    #[test]
    fn test_quot_and_rem_signs() {
        let a = NumericType::Int(-7);
        let b = NumericType::Int(2);
        assert!(matches!(
            Ops::Int.quotient(&a, &b).unwrap(),
            NumericType::Int(-3)
        ));
        assert!(matches!(
            Ops::Int.remainder(&a, &b).unwrap(),
            NumericType::Int(-1)
        ));
        // i64::MIN % -1 must not trap
        assert!(matches!(
            Ops::Int
                .remainder(&NumericType::Int(i64::MIN), &NumericType::Int(-1))
                .unwrap(),
            NumericType::Int(0)
        ));
    }

    #[test]
    fn test_bigfloat_arithmetic() {
        let a = dec("1.25");
        let b = dec("0.75");
        assert_eq!(Ops::BigFloat.add(&a, &b).to_string(), "2.00M");
        assert_eq!(Ops::BigFloat.remainder(&dec("7.5"), &dec("2")).unwrap(), dec("1.5"));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(big("12").to_string(), "12N");
        assert_eq!(NumericType::Float(1.0).to_string(), "1.0");
        assert_eq!(NumericType::Float(f64::INFINITY).to_string(), "##Inf");
        assert_eq!(NumericType::Float(f64::NAN).to_string(), "##NaN");
    }

    #[test]
    fn test_to_int_truncates() {
        assert_eq!(NumericType::Float(3.9).to_int(), 3);
        assert_eq!(NumericType::make_ratio(7, 2).unwrap().to_int(), 3);
        assert_eq!(big("18446744073709551617").to_int(), 1);
    }
}
