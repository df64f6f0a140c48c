//! Finite field elements: integers modulo a prime, with field arithmetic.
//!
//! Binary operators are implemented on references and yield a `Result`,
//! since combining elements of different fields is an error:
//! `let c = (&a + &b)?;`

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::{BitcoinError, Result};

/// An element of Z/pZ
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldElement {
    value: BigInt,
    modulus: BigInt,
}

impl FieldElement {
    /// Create a field element, requiring `0 <= value < modulus`
    pub fn new(value: impl Into<BigInt>, modulus: impl Into<BigInt>) -> Result<Self> {
        let value = value.into();
        let modulus = modulus.into();
        if value < BigInt::zero() || value >= modulus {
            return Err(BitcoinError::ValueOutOfRange {
                value: value.to_string(),
                modulus: modulus.to_string(),
            });
        }
        Ok(FieldElement { value, modulus })
    }

    /// Build an element from any integer by reducing it into range
    pub(crate) fn reduce(value: BigInt, modulus: &BigInt) -> Self {
        FieldElement {
            value: value.mod_floor(modulus),
            modulus: modulus.clone(),
        }
    }

    #[inline]
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    #[inline]
    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    #[inline]
    pub fn is_even(&self) -> bool {
        self.value.is_even()
    }

    /// Raise to an integer power. The exponent is reduced mod `p - 1`
    /// first, so negative exponents work as inverses.
    pub fn pow(&self, exponent: impl Into<BigInt>) -> Self {
        let order = &self.modulus - BigInt::one();
        let exponent: BigInt = exponent.into();
        let n = exponent.mod_floor(&order);
        FieldElement {
            value: self.value.modpow(&n, &self.modulus),
            modulus: self.modulus.clone(),
        }
    }

    /// Multiply by a small integer constant
    pub fn scale(&self, k: u32) -> Self {
        Self::reduce(&self.value * k, &self.modulus)
    }

    /// Square root for fields with `p % 4 == 3`.
    /// The result is only meaningful when `self` is a quadratic residue.
    pub fn sqrt(&self) -> Self {
        let exp = (&self.modulus + BigInt::one()) / BigInt::from(4);
        FieldElement {
            value: self.value.modpow(&exp, &self.modulus),
            modulus: self.modulus.clone(),
        }
    }

    fn same_field(&self, other: &FieldElement, op: &'static str) -> Result<()> {
        if self.modulus != other.modulus {
            return Err(BitcoinError::FieldMismatch {
                op,
                lhs: self.modulus.to_string(),
                rhs: other.modulus.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement_{}({})", self.modulus, self.value)
    }
}

impl Add<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;

    fn add(self, other: &FieldElement) -> Result<FieldElement> {
        self.same_field(other, "add")?;
        Ok(FieldElement::reduce(&self.value + &other.value, &self.modulus))
    }
}

impl Sub<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;

    fn sub(self, other: &FieldElement) -> Result<FieldElement> {
        self.same_field(other, "subtract")?;
        Ok(FieldElement::reduce(&self.value - &other.value, &self.modulus))
    }
}

impl Mul<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;

    fn mul(self, other: &FieldElement) -> Result<FieldElement> {
        self.same_field(other, "multiply")?;
        Ok(FieldElement::reduce(&self.value * &other.value, &self.modulus))
    }
}

/// Division through Fermat's little theorem: `a / b = a * b^(p-2)`.
/// Only valid for prime moduli.
impl Div<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;

    fn div(self, other: &FieldElement) -> Result<FieldElement> {
        self.same_field(other, "divide")?;
        let exp = &self.modulus - BigInt::from(2);
        let inverse = other.value.modpow(&exp, &self.modulus);
        Ok(FieldElement::reduce(&self.value * inverse, &self.modulus))
    }
}
