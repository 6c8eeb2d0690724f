//! Position — planar coordinates and displacement vectors.

use std::ops::{Add, Mul, Sub};

use rand::Rng;

use crate::conf::FieldConfig;

/// A point on the field.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A displacement or a velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Uniform random placement inside the field, keeping `margin` clear of every edge.
    pub fn random_within<R: Rng>(field: &FieldConfig, rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(field.margin..=field.width - field.margin),
            y: rng.gen_range(field.margin..=field.height - field.margin),
        }
    }

    pub fn distance_to(self, other: Position) -> f64 {
        (other - self).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Unit vector in the same direction, or `None` for a zero or non-finite vector.
    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return None;
        }
        Some(Vec2::new(self.x / len, self.y / len))
    }
}

impl Sub for Position {
    type Output = Vec2;

    fn sub(self, rhs: Position) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Vec2> for Position {
    type Output = Position;

    fn add(self, rhs: Vec2) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_placement_respects_margin() {
        let field = FieldConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let p = Position::random_within(&field, &mut rng);
            assert!(p.x >= field.margin && p.x <= field.width - field.margin, "x out of bounds: {}", p.x);
            assert!(p.y >= field.margin && p.y <= field.height - field.margin, "y out of bounds: {}", p.y);
        }
    }

    #[test]
    fn test_normalize_zero_is_none() {
        assert_eq!(Vec2::ZERO.normalized(), None);
        assert_eq!(Vec2::new(f64::NAN, 1.0).normalized(), None);
    }

    #[test]
    fn test_normalize_produces_unit_length() {
        let unit = Vec2::new(3.0, -4.0).normalized().unwrap();
        assert!((unit.length() - 1.0).abs() < 1e-12);
        assert!((unit.x - 0.6).abs() < 1e-12);
        assert!((unit.y + 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_position_arithmetic() {
        let a = Position::new(1.0, 2.0);
        let b = Position::new(4.0, 6.0);
        assert_eq!(b - a, Vec2::new(3.0, 4.0));
        assert_eq!(a + Vec2::new(3.0, 4.0) * 2.0, Position::new(7.0, 10.0));
        assert_eq!(a.distance_to(b), 5.0);
    }
}
