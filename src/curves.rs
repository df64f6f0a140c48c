//! Core functions for math over Elliptic Curves over Finite Fields,
//! especially the ability to define Points on Curves and perform
//! addition and scalar multiplication.

use std::fmt;
use std::ops::{Add, Mul};

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::error::{BitcoinError, Result};
use crate::field::FieldElement;

/// A point (x, y) on the curve y^2 = x^3 + a*x + b over a finite field,
/// or the point at infinity of that curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: Option<FieldElement>,
    pub y: Option<FieldElement>,
    pub a: FieldElement,
    pub b: FieldElement,
}

impl Point {
    /// Create a finite point, checking that it satisfies the curve equation
    pub fn new(x: FieldElement, y: FieldElement, a: FieldElement, b: FieldElement) -> Result<Self> {
        let lhs = y.pow(2);
        let rhs = (&(&x.pow(3) + &(&a * &x)?)? + &b)?;
        if lhs != rhs {
            return Err(BitcoinError::PointNotOnCurve(
                x.value().to_string(),
                y.value().to_string(),
            ));
        }
        Ok(Point {
            x: Some(x),
            y: Some(y),
            a,
            b,
        })
    }

    /// The identity element of the curve (a, b)
    #[must_use]
    pub const fn infinity(a: FieldElement, b: FieldElement) -> Self {
        Point {
            x: None,
            y: None,
            a,
            b,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_infinity(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }

    /// Both affine coordinates, or `None` for the point at infinity
    #[inline]
    pub fn coords(&self) -> Option<(&FieldElement, &FieldElement)> {
        match (&self.x, &self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    #[inline]
    pub fn same_curve(&self, other: &Point) -> bool {
        self.a == other.a && self.b == other.b
    }

    fn identity(&self) -> Point {
        Point::infinity(self.a.clone(), self.b.clone())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.coords() {
            Some((x, y)) => write!(
                f,
                "Point({},{})_{}_{} FieldElement({})",
                x.value(),
                y.value(),
                self.a.value(),
                self.b.value(),
                x.modulus()
            ),
            None => write!(f, "Point(infinity) FieldElement({})", self.a.modulus()),
        }
    }
}

/// Core point addition logic - shared by all Add implementations
fn point_add_impl(lhs: &Point, rhs: &Point) -> Result<Point> {
    if !lhs.same_curve(rhs) {
        return Err(BitcoinError::CurveMismatch(lhs.to_string(), rhs.to_string()));
    }

    let Some((x1, y1)) = lhs.coords() else {
        return Ok(rhs.clone());
    };
    let Some((x2, y2)) = rhs.coords() else {
        return Ok(lhs.clone());
    };

    // P + (-P), or a tangent that is vertical
    if x1 == x2 && (y1 != y2 || y1.is_zero()) {
        return Ok(lhs.identity());
    }

    let s = if x1 == x2 {
        let numerator = (&x1.pow(2).scale(3) + &lhs.a)?;
        (&numerator / &y1.scale(2))?
    } else {
        (&(y2 - y1)? / &(x2 - x1)?)?
    };

    let x3 = (&(&s.pow(2) - x1)? - x2)?;
    let y3 = (&(&s * &(x1 - &x3)?)? - y1)?;

    Ok(Point {
        x: Some(x3),
        y: Some(y3),
        a: lhs.a.clone(),
        b: lhs.b.clone(),
    })
}

impl Add<&Point> for &Point {
    type Output = Result<Point>;

    #[inline]
    fn add(self, other: &Point) -> Result<Point> {
        point_add_impl(self, other)
    }
}

impl Add for Point {
    type Output = Result<Point>;

    #[inline]
    fn add(self, other: Point) -> Result<Point> {
        point_add_impl(&self, &other)
    }
}

/// Scalar multiplication: k * Point
impl Mul<&Point> for &BigInt {
    type Output = Result<Point>;

    fn mul(self, point: &Point) -> Result<Point> {
        scalar_mul(self, point)
    }
}

impl Mul<&Point> for BigInt {
    type Output = Result<Point>;

    fn mul(self, point: &Point) -> Result<Point> {
        scalar_mul(&self, point)
    }
}

/// Double-and-add scalar multiplication over the bits of `k`
pub fn scalar_mul(k: &BigInt, point: &Point) -> Result<Point> {
    if k.is_negative() {
        return Err(BitcoinError::ValueOutOfRange {
            value: k.to_string(),
            modulus: "unbounded (scalar must be non-negative)".into(),
        });
    }
    let mut result = point.identity();
    let mut addend = point.clone();
    let mut k = k.clone();

    while !k.is_zero() {
        if (&k & BigInt::one()).is_one() {
            result = (&result + &addend)?;
        }
        addend = (&addend + &addend)?;
        k >>= 1;
    }
    Ok(result)
}
