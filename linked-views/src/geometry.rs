use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

/// Axis-aligned bounds, used for map zoom-to-selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct BoundingBox {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl BoundingBox {
    pub fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min: (self.min.0.min(other.min.0), self.min.1.min(other.min.1)),
            max: (self.max.0.max(other.max.0), self.max.1.max(other.max.1)),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min.0 && x <= self.max.0 && y >= self.min.1 && y <= self.max.1
    }
}

/// A simple polygon ring. The closing edge back to the first vertex is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub vertices: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }

    /// Square with its lower-left corner at `origin`.
    pub fn square(origin: (f64, f64), side: f64) -> Self {
        let (x, y) = origin;
        Self::new(vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)])
    }

    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        let (first, rest) = self.vertices.split_first()?;
        let init = BoundingBox {
            min: *first,
            max: *first,
        };
        Some(rest.iter().fold(init, |bb, &(x, y)| BoundingBox {
            min: (bb.min.0.min(x), bb.min.1.min(y)),
            max: (bb.max.0.max(x), bb.max.1.max(y)),
        }))
    }

    /// Even-odd ray casting. Points exactly on an edge may land either way.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_contains_interior_not_exterior() {
        let sq = Polygon::square((0.0, 0.0), 2.0);
        assert!(sq.contains(1.0, 1.0));
        assert!(!sq.contains(3.0, 1.0));
        assert!(!sq.contains(-0.5, 1.0));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // U shape: notch between x=1..2 above y=1
        let u = Polygon::new(vec![
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ]);
        assert!(u.contains(0.5, 2.0));
        assert!(u.contains(2.5, 2.0));
        assert!(!u.contains(1.5, 2.0));
        assert!(u.contains(1.5, 0.5));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = Polygon::new(vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(line.is_degenerate());
        assert!(!line.contains(0.5, 0.5));
    }

    #[test]
    fn bounds_and_union() {
        let a = Polygon::square((0.0, 0.0), 1.0).bounds().unwrap();
        let b = Polygon::square((2.0, -1.0), 1.0).bounds().unwrap();
        let u = a.union(b);
        assert_eq!(u.min, (0.0, -1.0));
        assert_eq!(u.max, (3.0, 1.0));
        assert!(u.contains(1.5, 0.0));
        assert!(Polygon::new(vec![]).bounds().is_none());
    }
}
