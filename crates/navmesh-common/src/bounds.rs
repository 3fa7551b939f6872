//! Axis-aligned bounding boxes

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// An inverted box that any point expands into a valid one
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a box from its center and full size, the way volumes are authored
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Computes the bounds of a point set; an empty set yields a zero box
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Vec3>,
    {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.expand(*p);
        }
        if bounds.is_empty() {
            Self::new(Vec3::ZERO, Vec3::ZERO)
        } else {
            bounds
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive point containment
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Inclusive overlap test
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.min.x > other.max.x
            || self.max.x < other.min.x
            || self.min.y > other.max.y
            || self.max.y < other.min.y
            || self.min.z > other.max.z
            || self.max.z < other.min.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_center_size() {
        let b = Aabb::from_center_size(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(b.min, Vec3::new(0.0, -2.0, -3.0));
        assert_eq!(b.max, Vec3::new(2.0, 2.0, 3.0));
        assert_eq!(b.center(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_from_points_empty_is_zero() {
        let b = Aabb::from_points(&[]);
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ZERO);
    }

    #[test]
    fn test_contains_and_intersects() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(a.contains_point(Vec3::splat(0.5)));
        assert!(a.contains_point(Vec3::ONE));
        assert!(!a.contains_point(Vec3::new(1.5, 0.5, 0.5)));

        let b = Aabb::new(Vec3::splat(0.9), Vec3::splat(2.0));
        let c = Aabb::new(Vec3::splat(1.1), Vec3::splat(2.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
