use eframe::egui::{Vec2, vec2};

const QUADTREE_LEAF_CAPACITY: usize = 8;
const QUADTREE_MAX_DEPTH: usize = 10;

#[derive(Clone, Copy)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn from_points(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let center = (min + max) * 0.5;
        let span_x = (max.x - min.x).max(1.0);
        let span_y = (max.y - min.y).max(1.0);
        let half_extent = (span_x.max(span_y) * 0.5) + 1.0;

        Some(Self {
            center,
            half_extent,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let min = self.center - vec2(self.half_extent, self.half_extent);
        let max = self.center + vec2(self.half_extent, self.half_extent);
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };
        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        let right = point.x >= self.center.x;
        let lower = point.y >= self.center.y;
        match (right, lower) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }
}

/// Barnes-Hut cell. `charge` is the summed repulsion strength of every node
/// below it and `center_of_charge` the strength-weighted centroid.
pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    pub(super) center_of_charge: Vec2,
    pub(super) charge: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2], charges: &[f32]) -> Option<Self> {
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, charges, 0))
    }

    fn build_node(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        charges: &[f32],
        depth: usize,
    ) -> Self {
        let mut weighted = Vec2::ZERO;
        let mut charge = 0.0;
        for &index in &indices {
            weighted += positions[index] * charges[index];
            charge += charges[index];
        }

        let center_of_charge = if charge > 0.0 {
            weighted / charge
        } else {
            bounds.center
        };

        let mut node = Self {
            bounds,
            center_of_charge,
            charge,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= QUADTREE_MAX_DEPTH || node.indices.len() <= QUADTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.indices {
            let quadrant = bounds.quadrant_for(positions[index]);
            buckets[quadrant].push(index);
        }

        let non_empty = buckets.iter().filter(|bucket| !bucket.is_empty()).count();
        if non_empty <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }

            node.children[quadrant] = Some(Box::new(Self::build_node(
                bounds.child(quadrant),
                bucket,
                positions,
                charges,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_charge_and_weighted_center() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let charges = vec![3.0, 1.0];
        let root = QuadNode::build(&positions, &charges).unwrap();
        assert_eq!(root.charge, 4.0);
        assert_eq!(root.center_of_charge, vec2(2.5, 0.0));
        assert!(root.is_leaf());
    }

    #[test]
    fn test_splits_past_leaf_capacity() {
        let positions = (0..40)
            .map(|index| vec2((index % 8) as f32 * 20.0, (index / 8) as f32 * 20.0))
            .collect::<Vec<_>>();
        let charges = vec![1.0; positions.len()];
        let root = QuadNode::build(&positions, &charges).unwrap();
        assert!(!root.is_leaf());
        assert!(root.indices.is_empty());
        assert_eq!(root.charge, 40.0);
        assert!(positions.iter().all(|&point| root.bounds.contains(point)));
    }

    #[test]
    fn test_empty_positions_build_nothing() {
        assert!(QuadNode::build(&[], &[]).is_none());
    }
}
