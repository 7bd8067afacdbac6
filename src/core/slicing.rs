// Plane cross-sections of a triangle mesh and tape-style perimeters
//
// A circumference is the perimeter of the convex hull of one connected
// cross-section, which is what a tape measure wrapped around the body reads.

use crate::models::mesh::TriangleMesh;
use glam::{Vec2, Vec3};
use std::collections::HashMap;

/// Cutting plane through `origin` with unit `normal`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Vec3,
    pub normal: Vec3,
}

impl Plane {
    /// Returns `None` when the normal has no usable direction
    pub fn new(origin: Vec3, normal: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            normal: normal.try_normalize()?,
        })
    }

    /// Plane perpendicular to the up axis (y)
    pub fn horizontal(origin: Vec3) -> Self {
        Self {
            origin,
            normal: Vec3::Y,
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        (point - self.origin).dot(self.normal)
    }

    /// In-plane coordinates of a point
    pub fn project(&self, point: Vec3) -> Vec2 {
        let (u, v) = self.normal.any_orthonormal_pair();
        let rel = point - self.origin;
        Vec2::new(rel.dot(u), rel.dot(v))
    }
}

/// One connected piece of a cross-section
#[derive(Debug, Clone, Default)]
pub struct SliceComponent {
    pub points: Vec<Vec3>,
}

impl SliceComponent {
    pub fn distance_to(&self, target: Vec3) -> f32 {
        self.points
            .iter()
            .map(|p| p.distance(target))
            .fold(f32::INFINITY, f32::min)
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new() -> Self {
        Self { parent: Vec::new() }
    }

    fn add(&mut self) -> usize {
        self.parent.push(self.parent.len());
        self.parent.len() - 1
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Cut the mesh with a plane and group the crossing points into connected pieces.
///
/// Vertices lying exactly on the plane count as being on its positive side,
/// so every crossed triangle contributes exactly one segment.
pub fn slice_mesh(mesh: &TriangleMesh, plane: &Plane) -> Vec<SliceComponent> {
    let positions: Vec<Vec3> = mesh.vertices.iter().map(|v| Vec3::from_array(*v)).collect();
    let distances: Vec<f32> = positions.iter().map(|p| plane.signed_distance(*p)).collect();
    let above = |i: u32| distances[i as usize] >= 0.0;

    let mut nodes: HashMap<(u32, u32), usize> = HashMap::new();
    let mut points: Vec<Vec3> = Vec::new();
    let mut sets = UnionFind::new();

    let mut node_for = |a: u32, b: u32, sets: &mut UnionFind| -> usize {
        let key = (a.min(b), a.max(b));
        *nodes.entry(key).or_insert_with(|| {
            let (da, db) = (distances[key.0 as usize], distances[key.1 as usize]);
            let t = da / (da - db);
            points.push(positions[key.0 as usize].lerp(positions[key.1 as usize], t));
            sets.add()
        })
    };

    for face in &mesh.faces {
        let crossings: Vec<(u32, u32)> = [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])]
            .into_iter()
            .filter(|&(a, b)| above(a) != above(b))
            .collect();

        if let [first, second] = crossings.as_slice() {
            let n1 = node_for(first.0, first.1, &mut sets);
            let n2 = node_for(second.0, second.1, &mut sets);
            sets.union(n1, n2);
        }
    }

    let mut groups: HashMap<usize, SliceComponent> = HashMap::new();
    for (node, point) in points.into_iter().enumerate() {
        let root = sets.find(node);
        groups.entry(root).or_default().points.push(point);
    }

    let mut components: Vec<SliceComponent> = groups.into_values().collect();
    components.sort_by(|a, b| b.points.len().cmp(&a.points.len()));
    components
}

/// The cross-section piece passing closest to `target`
pub fn nearest_component(components: &[SliceComponent], target: Vec3) -> Option<&SliceComponent> {
    components.iter().min_by(|a, b| {
        a.distance_to(target)
            .partial_cmp(&b.distance_to(target))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

/// Convex hull in counter-clockwise order (monotone chain)
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut sorted: Vec<Vec2> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut hull: Vec<Vec2> = Vec::with_capacity(sorted.len() * 2);
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop();
    hull
}

/// Perimeter of a closed polygon
pub fn perimeter(polygon: &[Vec2]) -> f64 {
    match polygon.len() {
        0 | 1 => 0.0,
        n => (0..n)
            .map(|i| polygon[i].distance(polygon[(i + 1) % n]) as f64)
            .sum(),
    }
}

/// Tape length around a cross-section piece
pub fn hull_perimeter(component: &SliceComponent, plane: &Plane) -> f64 {
    let projected: Vec<Vec2> = component.points.iter().map(|p| plane.project(*p)).collect();
    perimeter(&convex_hull(&projected))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Open cylinder of `rings` stacked circles with `segments` vertices each
    pub(crate) fn cylinder(
        center: [f32; 2],
        radius: f32,
        y_min: f32,
        y_max: f32,
        segments: u32,
        rings: u32,
    ) -> TriangleMesh {
        let mut vertices = Vec::new();
        for r in 0..rings {
            let y = y_min + (y_max - y_min) * r as f32 / (rings - 1) as f32;
            for s in 0..segments {
                let a = std::f32::consts::TAU * s as f32 / segments as f32;
                vertices.push([center[0] + radius * a.cos(), y, center[1] + radius * a.sin()]);
            }
        }

        let mut faces = Vec::new();
        for r in 0..rings - 1 {
            for s in 0..segments {
                let a = r * segments + s;
                let b = r * segments + (s + 1) % segments;
                let c = a + segments;
                let d = b + segments;
                faces.push([a, b, d]);
                faces.push([a, d, c]);
            }
        }

        TriangleMesh::new(vertices, faces).unwrap()
    }

    fn merge(a: TriangleMesh, b: TriangleMesh) -> TriangleMesh {
        let offset = a.vertices.len() as u32;
        let mut vertices = a.vertices;
        vertices.extend(b.vertices);
        let mut faces = a.faces;
        faces.extend(b.faces.iter().map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]));
        TriangleMesh::new(vertices, faces).unwrap()
    }

    fn polygon_perimeter(radius: f64, segments: u32) -> f64 {
        2.0 * segments as f64 * radius * (PI / segments as f64).sin()
    }

    #[test]
    fn test_horizontal_slice_of_cylinder() {
        let mesh = cylinder([0.0, 0.0], 0.15, 0.0, 1.0, 64, 11);
        let plane = Plane::horizontal(Vec3::new(0.0, 0.55, 0.0));

        let components = slice_mesh(&mesh, &plane);
        assert_eq!(components.len(), 1);
        // One crossing on every vertical and every diagonal edge
        assert_eq!(components[0].points.len(), 128);

        let length = hull_perimeter(&components[0], &plane);
        assert_relative_eq!(length, polygon_perimeter(0.15, 64), epsilon = 1e-4);
    }

    #[test]
    fn test_slice_through_vertex_ring() {
        let mesh = cylinder([0.0, 0.0], 0.1, 0.0, 1.0, 32, 11);
        let plane = Plane::horizontal(Vec3::new(0.0, 0.5, 0.0));

        let components = slice_mesh(&mesh, &plane);
        assert_eq!(components.len(), 1);
        let length = hull_perimeter(&components[0], &plane);
        assert_relative_eq!(length, polygon_perimeter(0.1, 32), epsilon = 1e-4);
    }

    #[test]
    fn test_nearest_component_picks_closest_leg() {
        let left = cylinder([-0.2, 0.0], 0.05, 0.0, 1.0, 24, 5);
        let right = cylinder([0.2, 0.0], 0.08, 0.0, 1.0, 24, 5);
        let mesh = merge(left, right);
        let plane = Plane::horizontal(Vec3::new(0.0, 0.3, 0.0));

        let components = slice_mesh(&mesh, &plane);
        assert_eq!(components.len(), 2);

        let picked = nearest_component(&components, Vec3::new(0.25, 0.3, 0.0)).unwrap();
        let length = hull_perimeter(picked, &plane);
        assert_relative_eq!(length, polygon_perimeter(0.08, 24), epsilon = 1e-4);
    }

    #[test]
    fn test_plane_missing_mesh() {
        let mesh = cylinder([0.0, 0.0], 0.1, 0.0, 1.0, 16, 3);
        let plane = Plane::horizontal(Vec3::new(0.0, 2.0, 0.0));
        assert!(slice_mesh(&mesh, &plane).is_empty());
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(0.5, 0.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(perimeter(&hull), 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_normal() {
        assert!(Plane::new(Vec3::ZERO, Vec3::ZERO).is_none());
        let plane = Plane::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0)).unwrap();
        assert_relative_eq!(plane.normal.length(), 1.0);
    }
}
