use std::cmp::Ordering;
use std::fmt;

/// A fractional permission amount in the closed interval from `NONE` to
/// `WRITE`, kept as an exact normalized rational. Arithmetic leaving the
/// interval fails; amounts are never clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PermAmount {
    num: u64,
    den: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PermError {
    #[error("permission amount {lhs} + {rhs} exceeds a full write permission")]
    Overflow { lhs: PermAmount, rhs: PermAmount },
    #[error("permission amount {lhs} - {rhs} is negative")]
    Underflow { lhs: PermAmount, rhs: PermAmount },
    #[error("permission fraction {num}/{den} lies outside [none, write]")]
    OutOfRange { num: u64, den: u64 },
    #[error("permission fraction has a zero denominator")]
    ZeroDenominator,
    #[error("permission fraction {num}/{den} does not reduce to a representable amount")]
    Unrepresentable { num: u128, den: u128 },
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl PermAmount {
    pub const NONE: PermAmount = PermAmount { num: 0, den: 1 };
    pub const WRITE: PermAmount = PermAmount { num: 1, den: 1 };
    /// The fraction handed out for a shared borrow.
    pub const READ: PermAmount = PermAmount { num: 1, den: 2 };

    pub fn frac(num: u64, den: u64) -> Result<Self, PermError> {
        if den == 0 {
            return Err(PermError::ZeroDenominator);
        }
        if num > den {
            return Err(PermError::OutOfRange { num, den });
        }
        // Reduction of a u64/u64 fraction always fits.
        Self::reduced(num as u128, den as u128)
    }

    // Requires num <= den and den != 0. A fraction whose reduced denominator
    // still needs more than 64 bits has no representation here; arithmetic
    // that produces one fails rather than truncate.
    fn reduced(num: u128, den: u128) -> Result<PermAmount, PermError> {
        let g = gcd(num, den);
        if den / g > u64::MAX as u128 {
            return Err(PermError::Unrepresentable { num, den });
        }
        Ok(PermAmount {
            num: (num / g) as u64,
            den: (den / g) as u64,
        })
    }

    pub fn is_none(&self) -> bool {
        self.num == 0
    }

    pub fn is_write(&self) -> bool {
        self.num == self.den
    }

    pub fn add(self, other: PermAmount) -> Result<PermAmount, PermError> {
        let den = self.den as u128 * other.den as u128;
        // A sum past u128 certainly exceeds `den`, so it reports the same
        // overflow as any other sum above a full permission.
        let num = (self.num as u128 * other.den as u128)
            .checked_add(other.num as u128 * self.den as u128)
            .ok_or(PermError::Overflow {
                lhs: self,
                rhs: other,
            })?;
        if num > den {
            return Err(PermError::Overflow {
                lhs: self,
                rhs: other,
            });
        }
        Self::reduced(num, den)
    }

    pub fn sub(self, other: PermAmount) -> Result<PermAmount, PermError> {
        let lhs = self.num as u128 * other.den as u128;
        let rhs = other.num as u128 * self.den as u128;
        if lhs < rhs {
            return Err(PermError::Underflow {
                lhs: self,
                rhs: other,
            });
        }
        Self::reduced(lhs - rhs, self.den as u128 * other.den as u128)
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn den(&self) -> u64 {
        self.den
    }
}

impl PartialOrd for PermAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PermAmount {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.num as u128 * other.den as u128;
        let rhs = other.num as u128 * self.den as u128;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for PermAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else if self.is_write() {
            write!(f, "write")
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounds() {
        assert_eq!(
            PermAmount::WRITE.add(PermAmount::READ),
            Err(PermError::Overflow {
                lhs: PermAmount::WRITE,
                rhs: PermAmount::READ,
            })
        );
        assert_eq!(
            PermAmount::NONE.sub(PermAmount::READ),
            Err(PermError::Underflow {
                lhs: PermAmount::NONE,
                rhs: PermAmount::READ,
            })
        );
        assert_eq!(
            PermAmount::READ.add(PermAmount::READ),
            Ok(PermAmount::WRITE)
        );
        assert_eq!(PermAmount::frac(0, 5), Ok(PermAmount::NONE));
        assert_eq!(PermAmount::frac(4, 4), Ok(PermAmount::WRITE));
        assert_eq!(
            PermAmount::frac(3, 2),
            Err(PermError::OutOfRange { num: 3, den: 2 })
        );
        assert_eq!(PermAmount::frac(1, 0), Err(PermError::ZeroDenominator));
    }

    #[test]
    fn extreme_denominators_do_not_wrap() {
        // Coprime denominators near u64::MAX: the exact sum stays in range
        // but its reduced denominator needs more than 64 bits.
        let a = PermAmount::frac(1, u64::MAX).unwrap();
        let b = PermAmount::frac(1, u64::MAX - 1).unwrap();
        assert!(matches!(a.add(b), Err(PermError::Unrepresentable { .. })));

        // The cross-multiplied numerator exceeds u128 here; the sum is far
        // above a full permission and must say so instead of wrapping.
        let big = PermAmount::frac(u64::MAX - 1, u64::MAX).unwrap();
        assert_eq!(
            big.add(big),
            Err(PermError::Overflow { lhs: big, rhs: big })
        );

        // Subtraction runs through the same reduction: this difference is
        // exactly 1 / (u64::MAX * (u64::MAX - 1)).
        assert!(matches!(
            b.sub(a),
            Err(PermError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn ordering() {
        let third = PermAmount::frac(1, 3).unwrap();
        assert!(PermAmount::NONE < third);
        assert!(third < PermAmount::READ);
        assert!(PermAmount::READ < PermAmount::WRITE);
    }

    // Add and sub must be mutual inverses whenever both are defined.
    #[test]
    fn add_sub_roundtrip_random() {
        use rand::{Rng, SeedableRng};
        use rand_pcg::Pcg64Mcg;

        // Seed generated once for deterministic tests
        let mut gen = Pcg64Mcg::seed_from_u64(0x51c8a7b3d94e02f7);

        const NUM_TESTS: u32 = 2000;

        for _ in 0..NUM_TESTS {
            let a_den = gen.random_range(1..=24u64);
            let b_den = gen.random_range(1..=24u64);
            let a = PermAmount::frac(gen.random_range(0..=a_den), a_den).unwrap();
            let b = PermAmount::frac(gen.random_range(0..=b_den), b_den).unwrap();

            match a.add(b) {
                Ok(sum) => {
                    assert!(sum <= PermAmount::WRITE);
                    assert_eq!(sum.sub(b), Ok(a));
                    assert_eq!(sum.sub(a), Ok(b));
                }
                Err(err) => {
                    // The exact sum must genuinely exceed a full permission.
                    assert_eq!(err, PermError::Overflow { lhs: a, rhs: b });
                    let total =
                        a.num() as u128 * b.den() as u128 + b.num() as u128 * a.den() as u128;
                    assert!(total > a.den() as u128 * b.den() as u128);
                }
            }

            match a.sub(b) {
                Ok(diff) => {
                    assert_eq!(diff.add(b), Ok(a));
                }
                Err(_) => assert!(a < b),
            }
        }
    }
}
