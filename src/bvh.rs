use glam::{Vec2, Vec3};

use crate::stats;

/// Distinguishes camera rays from occlusion probes. Shadow rays skip
/// transparent objects during [`crate::render::trace`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RayKind {
    Primary,
    Shadow,
}

/// A ray defined by an origin and a direction.
///
/// The direction must be normalised (unit-length) for the intersection
/// distances to be meaningful. Callers are responsible for normalisation.
#[derive(Clone, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub kind: RayKind,
}

impl Ray {
    pub fn primary(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            kind: RayKind::Primary,
        }
    }

    pub fn shadow(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            kind: RayKind::Shadow,
        }
    }
}

/// An axis-aligned bounding box (AABB).
#[derive(Clone, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Slab-method ray-AABB intersection test.
    ///
    /// The slab for each axis is picked by the sign of `inv_dir`, so a zero
    /// direction component resolves through IEEE infinity arithmetic without
    /// a special case.
    pub fn intersect(&self, origin: Vec3, inv_dir: Vec3) -> bool {
        stats::count_box_test();
        let bounds = [self.min, self.max];
        let sign = [
            (inv_dir.x < 0.0) as usize,
            (inv_dir.y < 0.0) as usize,
            (inv_dir.z < 0.0) as usize,
        ];

        let mut tmin = (bounds[sign[0]].x - origin.x) * inv_dir.x;
        let mut tmax = (bounds[1 - sign[0]].x - origin.x) * inv_dir.x;
        let tymin = (bounds[sign[1]].y - origin.y) * inv_dir.y;
        let tymax = (bounds[1 - sign[1]].y - origin.y) * inv_dir.y;
        if tmin > tymax || tymin > tmax {
            return false;
        }
        if tymin > tmin {
            tmin = tymin;
        }
        if tymax < tmax {
            tmax = tymax;
        }

        let tzmin = (bounds[sign[2]].z - origin.z) * inv_dir.z;
        let tzmax = (bounds[1 - sign[2]].z - origin.z) * inv_dir.z;
        if tmin > tzmax || tzmin > tmax {
            return false;
        }
        true
    }
}

/// A triangle with per-vertex shading normals.
#[derive(Clone, Debug)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub na: Vec3,
    pub nb: Vec3,
    pub nc: Vec3,
}

impl Triangle {
    /// Build a triangle without explicit shading normals; all three vertex
    /// normals fall back to the geometric face normal.
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let n = (b - a).cross(c - a);
        Self {
            a,
            b,
            c,
            na: n,
            nb: n,
            nc: n,
        }
    }

    pub fn with_normals(a: Vec3, b: Vec3, c: Vec3, na: Vec3, nb: Vec3, nc: Vec3) -> Self {
        Self { a, b, c, na, nb, nc }
    }

    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        aabb.expand(self.a);
        aabb.expand(self.b);
        aabb.expand(self.c);
        aabb
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns the hit distance and the barycentric coordinates as
    /// `(t, u, v)`, or `None` on a miss. With `cull` set, back-facing
    /// triangles are rejected as well.
    pub fn intersect(&self, origin: Vec3, direction: Vec3, cull: bool) -> Option<(f32, f32, f32)> {
        stats::count_triangle_test();
        const EPSILON: f32 = 1e-8;
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let p = direction.cross(edge2);
        let det = edge1.dot(p);
        if cull && det < EPSILON {
            return None;
        }
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        if t < 0.0 {
            return None;
        }
        Some((t, u, v))
    }
}

/// Nearest triangle hit reported by a BVH traversal.
#[derive(Clone, Copy, Debug)]
pub struct MeshHit {
    pub t: f32,
    pub tri: usize,
    pub uv: Vec2,
}

/// A node in the BVH tree. Leaves hold indices into the owning mesh's
/// triangle buffer; a triangle that straddles a split plane is referenced by
/// both children.
enum BvhNode {
    Leaf {
        bounds: Aabb,
        triangle_indices: Vec<usize>,
    },
    Interior {
        bounds: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } => bounds,
            BvhNode::Interior { bounds, .. } => bounds,
        }
    }

    /// Traverse the subtree, keeping the nearest hit seen so far. Both
    /// children are always visited; the shallow tree makes ordered traversal
    /// not worth its bookkeeping.
    fn intersect(
        &self,
        triangles: &[Triangle],
        origin: Vec3,
        direction: Vec3,
        inv_dir: Vec3,
        cull: bool,
        best: &mut Option<MeshHit>,
    ) {
        if !self.bounds().intersect(origin, inv_dir) {
            return;
        }
        match self {
            BvhNode::Leaf {
                triangle_indices, ..
            } => {
                for &idx in triangle_indices {
                    if let Some((t, u, v)) = triangles[idx].intersect(origin, direction, cull) {
                        if best.map_or(true, |hit| t < hit.t) {
                            *best = Some(MeshHit {
                                t,
                                tri: idx,
                                uv: Vec2::new(u, v),
                            });
                        }
                    }
                }
            }
            BvhNode::Interior { left, right, .. } => {
                left.intersect(triangles, origin, direction, inv_dir, cull, best);
                right.intersect(triangles, origin, direction, inv_dir, cull, best);
            }
        }
    }

    fn node_count(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Interior { left, right, .. } => 1 + left.node_count() + right.node_count(),
        }
    }
}

const MAX_DEPTH: u32 = 10;
const BASE_LEAF_SIZE: usize = 10;

/// Bounding volume hierarchy built once per mesh.
///
/// The split plane sits at the mean vertex coordinate along the longest axis
/// of the node's bounds, and children receive the parent bounds clipped at
/// the split. Robustness is preferred over strict partitioning: a straddling
/// triangle lands in both children.
pub struct Bvh {
    root: Option<BvhNode>,
}

impl Bvh {
    /// Build a BVH over the given triangles. `leaf_penalty` scales the leaf
    /// threshold, trading traversal depth for larger leaves.
    pub fn build(triangles: &[Triangle], leaf_penalty: u32) -> Self {
        if triangles.is_empty() {
            return Self { root: None };
        }
        let mut bounds = Aabb::empty();
        for tri in triangles {
            bounds.expand(tri.a);
            bounds.expand(tri.b);
            bounds.expand(tri.c);
        }
        let leaf_size = BASE_LEAF_SIZE * leaf_penalty.max(1) as usize;
        let indices: Vec<usize> = (0..triangles.len()).collect();
        let root = Self::build_node(triangles, indices, bounds, 0, leaf_size);
        Self { root: Some(root) }
    }

    fn build_node(
        triangles: &[Triangle],
        indices: Vec<usize>,
        bounds: Aabb,
        depth: u32,
        leaf_size: usize,
    ) -> BvhNode {
        if indices.len() < leaf_size || depth > MAX_DEPTH {
            return BvhNode::Leaf {
                bounds,
                triangle_indices: indices,
            };
        }

        // Longest axis of this node's bounds, ties resolved x over y over z.
        let dim = bounds.max - bounds.min;
        let axis = if dim.x >= dim.y && dim.x >= dim.z {
            0
        } else if dim.y >= dim.z {
            1
        } else {
            2
        };

        // Mean coordinate over every vertex of every triangle in the node.
        let mut sum = 0.0f32;
        for &i in &indices {
            let tri = &triangles[i];
            sum += tri.a[axis] + tri.b[axis] + tri.c[axis];
        }
        let split = sum / (3.0 * indices.len() as f32);

        let mut left_indices = Vec::new();
        let mut right_indices = Vec::new();
        for &i in &indices {
            let tri = &triangles[i];
            if tri.a[axis] <= split || tri.b[axis] <= split || tri.c[axis] <= split {
                left_indices.push(i);
            }
            if tri.a[axis] >= split || tri.b[axis] >= split || tri.c[axis] >= split {
                right_indices.push(i);
            }
        }

        let mut left_bounds = bounds.clone();
        left_bounds.max[axis] = split;
        let mut right_bounds = bounds.clone();
        right_bounds.min[axis] = split;

        let left = Box::new(Self::build_node(
            triangles,
            left_indices,
            left_bounds,
            depth + 1,
            leaf_size,
        ));
        let right = Box::new(Self::build_node(
            triangles,
            right_indices,
            right_bounds,
            depth + 1,
            leaf_size,
        ));
        BvhNode::Interior {
            bounds,
            left,
            right,
        }
    }

    /// Find the nearest triangle hit along a ray, or `None`.
    pub fn intersect(
        &self,
        triangles: &[Triangle],
        origin: Vec3,
        direction: Vec3,
        cull: bool,
    ) -> Option<MeshHit> {
        let root = self.root.as_ref()?;
        let inv_dir = Vec3::new(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z);
        let mut best = None;
        root.intersect(triangles, origin, direction, inv_dir, cull, &mut best);
        best
    }

    /// Number of nodes in the hierarchy, root included.
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, BvhNode::node_count)
    }
}
