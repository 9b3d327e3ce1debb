//! A crude decimal fixed point: a sign, an unsigned mantissa and the count of digits seen after
//! the decimal point.
//!
//! No floating point is involved. Scaling to steps or feed units happens once per field in
//! [`decimal_to_int`], using integer multiply and divide only.

use crate::Error;

/// The accumulator for one numeric field.
///
/// `decimal_digits == 0` means no decimal point has been seen yet, `1` means a point with no
/// digit after it, `2` a point followed by one digit, and so on.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct DecimalValue {
    pub sign: bool,
    pub mantissa: u32,
    pub decimal_digits: u8,
    overflowed: bool,
}

impl DecimalValue {
    pub const fn new() -> Self {
        Self {
            sign: false,
            mantissa: 0,
            decimal_digits: 0,
            overflowed: false,
        }
    }

    /// Feeds one byte of a numeric literal.
    ///
    /// Returns `false` if the byte is not part of a literal (`-`, `.` or a digit), in which case
    /// the value is left untouched.
    pub fn push(&mut self, b: u8) -> bool {
        match b {
            b'-' => {
                // the sign restarts the number: "1-2" reads as -2, not -12
                self.sign = true;
                self.mantissa = 0;
                self.decimal_digits = 0;
                self.overflowed = false;
            }
            b'.' => {
                if self.decimal_digits == 0 {
                    self.decimal_digits = 1;
                }
            }
            b'0'..=b'9' => {
                if self.overflowed {
                    return true;
                }
                let digit = u32::from(b - b'0');
                let next = self
                    .mantissa
                    .checked_mul(10)
                    .and_then(|m| m.checked_add(digit));
                let digits = if self.decimal_digits != 0 {
                    self.decimal_digits.checked_add(1)
                } else {
                    Some(0)
                };
                match (next, digits) {
                    (Some(m), Some(d)) => {
                        self.mantissa = m;
                        self.decimal_digits = d;
                    }
                    _ => self.overflowed = true,
                }
            }
            _ => return false,
        }
        true
    }

    /// Whether a digit did not fit in the mantissa.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Converts an accumulated value to an integer, scaled by `multiplicand / denominator`.
///
/// The order of operations is fixed: multiply, divide by the denominator, apply the sign, then
/// drop the fractional digits. Each division truncates toward zero.
pub fn decimal_to_int(value: &DecimalValue, multiplicand: i64, denominator: i64) -> Result<i64, Error> {
    if value.overflowed {
        return Err(Error::NumberOverflow);
    }
    let mut r = i64::from(value.mantissa);
    let mut digits = value.decimal_digits.saturating_sub(1);

    if multiplicand != 1 {
        r = r.checked_mul(multiplicand).ok_or(Error::NumberOverflow)?;
    }
    if denominator != 1 {
        r = r.checked_div(denominator).ok_or(Error::NumberOverflow)?;
    }

    if value.sign {
        r = -r;
    }

    // keep divisors small for the common short fractions
    while digits >= 5 {
        r /= 100_000;
        digits -= 5;
    }
    r /= match digits {
        1 => 10,
        2 => 100,
        3 => 1000,
        4 => 10_000,
        _ => 1,
    };

    Ok(r)
}

#[cfg(test)]
mod test {
    use super::{decimal_to_int, DecimalValue};
    use crate::Error;

    fn parse(s: &str) -> DecimalValue {
        let mut v = DecimalValue::new();
        for b in s.bytes() {
            assert!(v.push(b), "{:?} is not a literal byte", b as char);
        }
        v
    }

    #[test]
    fn digits_after_the_point_are_counted_with_a_marker() {
        let v = parse("12.5");
        assert_eq!(v.mantissa, 125);
        assert_eq!(v.decimal_digits, 2);
        assert!(!v.sign);

        let v = parse("7.");
        assert_eq!(v.mantissa, 7);
        assert_eq!(v.decimal_digits, 1);
    }

    #[test]
    fn only_the_first_decimal_point_counts() {
        let v = parse("1.2.3");
        assert_eq!(v.mantissa, 123);
        assert_eq!(v.decimal_digits, 3);
        assert_eq!(decimal_to_int(&v, 1, 1), Ok(1));
    }

    #[test]
    fn a_sign_restarts_the_number() {
        let v = parse("1-2");
        assert!(v.sign);
        assert_eq!(v.mantissa, 2);
        assert_eq!(decimal_to_int(&v, 1, 1), Ok(-2));

        let v = parse("3.5-4");
        assert_eq!(v.decimal_digits, 0);
        assert_eq!(decimal_to_int(&v, 1, 1), Ok(-4));
    }

    #[test]
    fn plain_integers_are_truncated_toward_zero() {
        assert_eq!(decimal_to_int(&parse("42"), 1, 1), Ok(42));
        assert_eq!(decimal_to_int(&parse("12.9"), 1, 1), Ok(12));
        assert_eq!(decimal_to_int(&parse("-12.9"), 1, 1), Ok(-12));
        assert_eq!(decimal_to_int(&parse(".75"), 100, 1), Ok(75));
    }

    #[test]
    fn scaled_conversion_keeps_the_fraction() {
        // 12.5mm at 100 steps/mm: 125 * 100000 / 1000 / 10
        assert_eq!(decimal_to_int(&parse("12.5"), 100_000, 1000), Ok(1250));
        assert_eq!(decimal_to_int(&parse("-0.01"), 100_000, 1000), Ok(-1));
    }

    #[test]
    fn long_fractions_divide_in_chunks() {
        // 1.0000005 * 10^7 with the marker: 7 fractional digits
        let v = parse("1.0000005");
        assert_eq!(v.decimal_digits, 8);
        assert_eq!(decimal_to_int(&v, 10_000_000, 1), Ok(10_000_005));
    }

    #[test]
    fn the_denominator_truncates_before_the_sign_and_scale() {
        // 1.9 inch/min feed: 19 * 254 / 10 = 482, then / 10 = 48
        assert_eq!(decimal_to_int(&parse("1.9"), 254, 10), Ok(48));
        assert_eq!(decimal_to_int(&parse("-1.9"), 254, 10), Ok(-48));
    }

    #[test]
    fn mantissa_overflow_fails_instead_of_wrapping() {
        let v = parse("99999999999");
        assert!(v.overflowed());
        assert_eq!(decimal_to_int(&v, 1, 1), Err(Error::NumberOverflow));

        // a sign restarts the literal and clears the condition
        let mut v = v;
        assert!(v.push(b'-'));
        assert!(v.push(b'1'));
        assert_eq!(decimal_to_int(&v, 1, 1), Ok(-1));
    }

    #[test]
    fn scaling_overflow_is_reported() {
        let v = parse("4000000000");
        assert_eq!(
            decimal_to_int(&v, 4_000_000_000, 1),
            Err(Error::NumberOverflow)
        );
        assert_eq!(decimal_to_int(&parse("1"), 1, 0), Err(Error::NumberOverflow));
    }

    #[test]
    fn other_bytes_are_not_consumed() {
        let mut v = parse("5");
        assert!(!v.push(b'x'));
        assert!(!v.push(b'+'));
        assert_eq!(v.mantissa, 5);
    }
}
