use std::ops::{Add, AddAssign, Mul, Sub};

/// 2D vector in screen coordinates (x grows right, y grows down)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const UP: Vec2 = Vec2 { x: 0.0, y: -1.0 };
    pub const DOWN: Vec2 = Vec2 { x: 0.0, y: 1.0 };
    pub const LEFT: Vec2 = Vec2 { x: -1.0, y: 0.0 };
    pub const RIGHT: Vec2 = Vec2 { x: 1.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector for a heading in degrees, 0 = right, 90 = up on screen.
    ///
    /// The vertical component is negated because screen y points down.
    #[inline]
    pub fn from_heading_degrees(degrees: f32) -> Self {
        let radians = degrees.to_radians();
        Self {
            x: radians.cos(),
            y: -radians.sin(),
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec2) -> f32 {
        (*self - other).length_sq()
    }

    /// Component-wise clamp into the box `[min, max]`
    pub fn clamp(&self, min: Vec2, max: Vec2) -> Self {
        Self {
            x: self.x.max(min.x).min(max.x),
            y: self.y.max(min.y).min(max.y),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Check if vector is approximately equal to another
    pub fn approx_eq(&self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_new() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.x, 3.0);
        assert_eq!(v.y, 4.0);
    }

    #[test]
    fn test_screen_axes() {
        assert_eq!(Vec2::UP, Vec2::new(0.0, -1.0));
        assert_eq!(Vec2::DOWN, Vec2::new(0.0, 1.0));
        assert_eq!(Vec2::LEFT, Vec2::new(-1.0, 0.0));
        assert_eq!(Vec2::RIGHT, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_length() {
        let v = Vec2::new(3.0, 4.0);
        assert!(approx_eq(v.length(), 5.0));
        assert!(approx_eq(v.length_sq(), 25.0));
    }

    #[test]
    fn test_distance() {
        let a = Vec2::new(100.0, 100.0);
        let b = Vec2::new(140.0, 100.0);
        assert!(approx_eq(a.distance_to(b), 40.0));
        assert!(approx_eq(a.distance_sq_to(b), 1600.0));
    }

    #[test]
    fn test_heading_right() {
        let v = Vec2::from_heading_degrees(0.0);
        assert!(v.approx_eq(Vec2::RIGHT, EPSILON));
    }

    #[test]
    fn test_heading_up_is_negative_y() {
        let v = Vec2::from_heading_degrees(90.0);
        assert!(v.approx_eq(Vec2::UP, EPSILON));
    }

    #[test]
    fn test_heading_down_and_left() {
        assert!(Vec2::from_heading_degrees(270.0).approx_eq(Vec2::DOWN, EPSILON));
        assert!(Vec2::from_heading_degrees(180.0).approx_eq(Vec2::LEFT, EPSILON));
        assert!(Vec2::from_heading_degrees(-90.0).approx_eq(Vec2::DOWN, EPSILON));
    }

    #[test]
    fn test_clamp_box() {
        let min = Vec2::ZERO;
        let max = Vec2::new(1872.0, 1032.0);

        assert_eq!(Vec2::new(1910.0, 1000.0).clamp(min, max), Vec2::new(1872.0, 1000.0));
        assert_eq!(Vec2::new(-5.0, 2000.0).clamp(min, max), Vec2::new(0.0, 1032.0));
        assert_eq!(Vec2::new(10.0, 10.0).clamp(min, max), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_ops() {
        let mut a = Vec2::new(1.0, 2.0);
        a += Vec2::new(1.0, 1.0) * 2.0;
        assert_eq!(a, Vec2::new(3.0, 4.0));
        assert_eq!(a - Vec2::new(3.0, 4.0), Vec2::ZERO);
        assert_eq!(a + Vec2::ZERO, a);
    }

    #[test]
    fn test_is_finite() {
        assert!(Vec2::new(1.0, 2.0).is_finite());
        assert!(!Vec2::new(f32::NAN, 2.0).is_finite());
        assert!(!Vec2::new(1.0, f32::INFINITY).is_finite());
    }
}
