use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::bvh::Ray;
use crate::mesh::Mesh;

/// Surface colour pattern evaluated at the hit's texture coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pattern {
    #[default]
    Solid,
    Chessboard,
}

const CHESSBOARD_SCALE: f32 = 4.0;
const CHESSBOARD_DARK: f32 = 0.25;

impl Pattern {
    /// Multiplicative weight applied to the diffuse contribution.
    pub fn weight(&self, tex: Vec2) -> f32 {
        match self {
            Pattern::Solid => 1.0,
            Pattern::Chessboard => {
                let ix = (tex.x * CHESSBOARD_SCALE).floor() as i64;
                let iy = (tex.y * CHESSBOARD_SCALE).floor() as i64;
                if (ix + iy) & 1 == 0 {
                    1.0
                } else {
                    CHESSBOARD_DARK
                }
            }
        }
    }
}

/// How a surface responds to light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Material {
    Diffuse,
    Phong {
        ambient: f32,
        diffuse: f32,
        specular: f32,
        exponent: f32,
    },
    Reflective,
    Transparent {
        ior: f32,
    },
}

/// Attributes shared by every object variant.
#[derive(Clone, Debug)]
pub struct Surface {
    pub color: Vec3,
    pub position: Vec3,
    pub pattern: Pattern,
    pub material: Material,
}

impl Surface {
    pub fn new(color: Vec3, position: Vec3) -> Self {
        Self {
            color,
            position,
            pattern: Pattern::Solid,
            material: Material::Diffuse,
        }
    }
}

/// Geometry of an object. Meshes carry their triangles and accelerator.
pub enum Shape {
    Sphere {
        radius: f32,
        /// Cached squared radius; the quadratic needs it for every ray.
        radius2: f32,
    },
    Plane {
        normal: Vec3,
    },
    Mesh(Mesh),
}

/// Result of an object intersection. `tri` and `uv` are only populated by
/// mesh hits, where the shading normal depends on which triangle was struck.
#[derive(Clone, Copy, Debug)]
pub struct ObjectHit {
    pub t: f32,
    pub tri: Option<usize>,
    pub uv: Vec2,
}

pub struct Object {
    pub surface: Surface,
    pub shape: Shape,
}

impl Object {
    pub fn new(surface: Surface, shape: Shape) -> Self {
        Self { surface, shape }
    }

    /// Nearest intersection with this object along the ray, or `None`.
    pub fn intersect(&self, ray: &Ray, cull: bool) -> Option<ObjectHit> {
        match &self.shape {
            Shape::Sphere { radius2, .. } => {
                self.intersect_sphere(ray.origin, ray.direction, *radius2)
            }
            Shape::Plane { normal } => self.intersect_plane(ray.origin, ray.direction, *normal),
            Shape::Mesh(mesh) => mesh.intersect(ray.origin, ray.direction, cull).map(|hit| {
                ObjectHit {
                    t: hit.t,
                    tri: Some(hit.tri),
                    uv: hit.uv,
                }
            }),
        }
    }

    fn intersect_sphere(&self, origin: Vec3, direction: Vec3, radius2: f32) -> Option<ObjectHit> {
        // Half-b quadratic; direction is unit length so a = 1.
        let oc = origin - self.surface.position;
        let b = oc.dot(direction);
        let c = oc.length_squared() - radius2;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let mut t = -b - sq;
        if t < 0.0 {
            t = -b + sq;
        }
        if t < 0.0 {
            return None;
        }
        Some(ObjectHit {
            t,
            tri: None,
            uv: Vec2::ZERO,
        })
    }

    fn intersect_plane(&self, origin: Vec3, direction: Vec3, normal: Vec3) -> Option<ObjectHit> {
        let denom = normal.dot(direction);
        if denom.abs() < 1e-8 {
            return None;
        }
        let t = (self.surface.position - origin).dot(normal) / denom;
        if t < 0.0 {
            return None;
        }
        Some(ObjectHit {
            t,
            tri: None,
            uv: Vec2::ZERO,
        })
    }

    /// Shading normal and texture coordinates at a hit point.
    pub fn surface_data(&self, hit_point: Vec3, tri: Option<usize>, uv: Vec2) -> (Vec3, Vec2) {
        match &self.shape {
            Shape::Sphere { radius, .. } => {
                let normal = (hit_point - self.surface.position) / *radius;
                let tex = Vec2::new(
                    (1.0 + normal.z.atan2(normal.x) / PI) * 0.5,
                    normal.y.clamp(-1.0, 1.0).acos() / PI,
                );
                (normal, tex)
            }
            Shape::Plane { normal } => {
                // Project the hit point onto a tangent basis of the plane so
                // patterns have stable 2D coordinates.
                let helper = if normal.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
                let u_axis = helper.cross(*normal).normalize();
                let v_axis = normal.cross(u_axis);
                let rel = hit_point - self.surface.position;
                (*normal, Vec2::new(rel.dot(u_axis), rel.dot(v_axis)))
            }
            Shape::Mesh(mesh) => {
                let tri = &mesh.triangles[tri.expect("mesh hit carries a triangle index")];
                let normal = (tri.na * (1.0 - uv.x - uv.y) + tri.nb * uv.x + tri.nc * uv.y)
                    .normalize_or_zero();
                (normal, uv)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::Triangle;

    fn sphere(center: Vec3, radius: f32) -> Object {
        Object::new(
            Surface::new(Vec3::ONE, center),
            Shape::Sphere {
                radius,
                radius2: radius * radius,
            },
        )
    }

    // ── Sphere ──────────────────────────────────────────────────────────────

    #[test]
    fn sphere_hit_from_outside() {
        let obj = sphere(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::primary(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let hit = obj.intersect(&ray, false).expect("must hit");
        assert!((hit.t - 4.0).abs() < 1e-5, "expected t=4, got {}", hit.t);
    }

    #[test]
    fn sphere_hit_from_inside_uses_far_root() {
        let obj = sphere(Vec3::ZERO, 2.0);
        let ray = Ray::primary(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let hit = obj.intersect(&ray, false).expect("must hit");
        assert!((hit.t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn sphere_behind_origin_misses() {
        let obj = sphere(Vec3::new(0.0, 0.0, 5.0), 1.0);
        let ray = Ray::primary(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        assert!(obj.intersect(&ray, false).is_none());
    }

    #[test]
    fn sphere_normal_points_outward() {
        let obj = sphere(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let (normal, _) = obj.surface_data(Vec3::new(0.0, 0.0, -4.0), None, Vec2::ZERO);
        assert!((normal - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
    }

    // ── Plane ───────────────────────────────────────────────────────────────

    #[test]
    fn plane_hit_and_parallel_miss() {
        let obj = Object::new(
            Surface::new(Vec3::ONE, Vec3::ZERO),
            Shape::Plane { normal: Vec3::Y },
        );
        let down = Ray::primary(Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = obj.intersect(&down, false).expect("must hit");
        assert!((hit.t - 3.0).abs() < 1e-5);

        let along = Ray::primary(Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(obj.intersect(&along, false).is_none());
    }

    // ── Mesh surface data ───────────────────────────────────────────────────

    #[test]
    fn mesh_normal_is_barycentric_interpolation() {
        let tri = Triangle::with_normals(
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
        );
        let mesh = Mesh::from_triangles(vec![tri], 1);
        let obj = Object::new(Surface::new(Vec3::ONE, Vec3::ZERO), Shape::Mesh(mesh));
        let uv = Vec2::new(0.25, 0.25);
        let (normal, tex) = obj.surface_data(Vec3::ZERO, Some(0), uv);
        let expected = (Vec3::X * 0.5 + Vec3::Y * 0.25 + Vec3::Z * 0.25).normalize();
        assert!((normal - expected).length() < 1e-5);
        assert_eq!(tex, uv);
    }

    // ── Pattern ─────────────────────────────────────────────────────────────

    #[test]
    fn chessboard_alternates_between_adjacent_cells() {
        let p = Pattern::Chessboard;
        let a = p.weight(Vec2::new(0.1, 0.1));
        let b = p.weight(Vec2::new(0.35, 0.1));
        assert_ne!(a, b, "neighbouring cells must differ");
        // Negative coordinates keep alternating instead of mirroring.
        let c = p.weight(Vec2::new(-0.1, 0.1));
        assert_ne!(a, c);
    }

    #[test]
    fn solid_pattern_is_identity() {
        assert_eq!(Pattern::Solid.weight(Vec2::new(123.4, -56.7)), 1.0);
    }
}
