use std::f32::consts::PI;

use glam::Vec3;

use crate::bvh::Ray;
use crate::object::Object;
use crate::render::trace;
use crate::scene::Options;

/// What a light contributes at a shaded point.
pub struct Illumination {
    /// Unit direction of travel of the light, pointing at the surface.
    pub dir: Vec3,
    pub intensity: Vec3,
    /// Distance to the emitter, used to clamp shadow rays. Infinite for
    /// distant lights.
    pub distance: f32,
}

/// Light source variants.
pub enum LightKind {
    Distant { dir: Vec3 },
    Point { pos: Vec3 },
    Area(AreaLight),
}

pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    pub fn distant(color: Vec3, intensity: f32, dir: Vec3) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Distant {
                dir: dir.normalize(),
            },
        }
    }

    pub fn point(color: Vec3, intensity: f32, pos: Vec3) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Point { pos },
        }
    }

    pub fn area(color: Vec3, intensity: f32, area: AreaLight) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Area(area),
        }
    }

    /// Direction, intensity and emitter distance at point `p`. Area lights
    /// are approximated by their origin here; the diffuse path samples them
    /// properly through [`AreaLight::total_illuminance`].
    pub fn illuminate(&self, p: Vec3) -> Illumination {
        match &self.kind {
            LightKind::Distant { dir } => Illumination {
                dir: *dir,
                intensity: self.color * self.intensity,
                distance: f32::INFINITY,
            },
            LightKind::Point { pos } | LightKind::Area(AreaLight { pos, .. }) => {
                let diff = p - *pos;
                let r2 = diff.length_squared();
                let distance = r2.sqrt();
                Illumination {
                    dir: diff / distance,
                    intensity: self.color * self.intensity / (4.0 * PI * r2),
                    distance,
                }
            }
        }
    }
}

/// A rectangular emitter spanned by two edge vectors.
///
/// Two sample grids are generated up front: the full grid drives the
/// high-quality estimate, while the much smaller base grid is probed first
/// to skip fully lit and fully shadowed regions cheaply.
pub struct AreaLight {
    pub pos: Vec3,
    pub i: Vec3,
    pub j: Vec3,
    pub samples: u32,
    pub base_samples: u32,
    points: Vec<Vec3>,
    base_points: Vec<Vec3>,
}

impl AreaLight {
    pub fn new(pos: Vec3, i: Vec3, j: Vec3, samples: u32, base_samples: u32) -> Self {
        Self {
            pos,
            i,
            j,
            samples,
            base_samples,
            points: sample_grid(pos, i, j, samples),
            base_points: sample_grid(pos, i, j, base_samples),
        }
    }

    /// Total radiance arriving at `p` with surface normal `n`.
    ///
    /// Shadow rays are clamped at the distance of their sample point, so
    /// geometry beyond the emitter never occludes. The base-grid early out
    /// bails to full sampling the moment visibility turns out mixed.
    pub fn total_illuminance(
        &self,
        color: Vec3,
        intensity: f32,
        p: Vec3,
        n: Vec3,
        objects: &[Object],
        options: &Options,
    ) -> Vec3 {
        let falloff =
            (intensity / (4.0 * PI * (p - self.pos).length_squared() / 1000.0)).min(1.0);
        let light = color * falloff;

        if options.area_light_acceleration
            && self.base_samples >= 1
            && self.base_points.len() < self.points.len()
        {
            let mut sum = 0.0f32;
            let mut visible = 0usize;
            let mut tested = 0usize;
            let mut mixed = false;
            for &q in &self.base_points {
                let diff = p - q;
                let dist = diff.length();
                let dir = diff / dist;
                let ray = Ray::shadow(p, -dir);
                if trace(&ray, objects, dist, options.backface_culling).is_none() {
                    visible += 1;
                    sum += n.dot(-dir).max(0.0);
                }
                tested += 1;
                mixed = visible != 0 && visible != tested;
                if mixed {
                    break;
                }
            }
            if !mixed {
                if visible == 0 {
                    return Vec3::ZERO;
                }
                return light * (sum / self.base_points.len() as f32);
            }
        }

        let mut sum = 0.0f32;
        for &q in &self.points {
            let diff = p - q;
            let dist = diff.length();
            let dir = diff / dist;
            let ray = Ray::shadow(p, -dir);
            if trace(&ray, objects, dist, options.backface_culling).is_none() {
                sum += n.dot(-dir).max(0.0);
            }
        }
        light * (sum / self.points.len() as f32)
    }
}

/// Evenly spaced `n x n` grid over the quad `pos + s*i + t*j`.
fn sample_grid(pos: Vec3, i: Vec3, j: Vec3, n: u32) -> Vec<Vec3> {
    match n {
        0 => Vec::new(),
        1 => vec![pos + (i + j) * 0.5],
        _ => {
            let step = 1.0 / (n - 1) as f32;
            let mut points = Vec::with_capacity((n * n) as usize);
            for a in 0..n {
                for b in 0..n {
                    points.push(pos + i * (a as f32 * step) + j * (b as f32 * step));
                }
            }
            points
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Material, Shape, Surface};

    fn default_options() -> Options {
        Options::default()
    }

    fn ground_plane() -> Object {
        Object::new(
            Surface::new(Vec3::ONE, Vec3::ZERO),
            Shape::Plane { normal: Vec3::Y },
        )
    }

    fn blocker_sphere(center: Vec3, radius: f32) -> Object {
        Object::new(
            Surface::new(Vec3::ONE, center),
            Shape::Sphere {
                radius,
                radius2: radius * radius,
            },
        )
    }

    // ── Illuminate ──────────────────────────────────────────────────────────

    #[test]
    fn distant_light_has_infinite_reach() {
        let light = Light::distant(Vec3::ONE, 2.0, Vec3::new(0.0, -2.0, 0.0));
        let ill = light.illuminate(Vec3::ZERO);
        assert!((ill.dir - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
        assert_eq!(ill.distance, f32::INFINITY);
        assert!((ill.intensity - Vec3::splat(2.0)).length() < 1e-6);
    }

    #[test]
    fn point_light_square_falloff() {
        let light = Light::point(Vec3::ONE, 100.0, Vec3::new(0.0, 10.0, 0.0));
        let ill = light.illuminate(Vec3::ZERO);
        assert!((ill.distance - 10.0).abs() < 1e-5);
        let expected = 100.0 / (4.0 * PI * 100.0);
        assert!((ill.intensity.x - expected).abs() < 1e-6);
        // The light travels downward toward the shaded point.
        assert!((ill.dir - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
    }

    // ── Sample grids ────────────────────────────────────────────────────────

    #[test]
    fn grid_counts_and_corners() {
        let grid = sample_grid(Vec3::ZERO, Vec3::X, Vec3::Z, 3);
        assert_eq!(grid.len(), 9);
        assert!(grid.contains(&Vec3::ZERO));
        assert!(grid.contains(&Vec3::new(1.0, 0.0, 1.0)));

        assert_eq!(sample_grid(Vec3::ZERO, Vec3::X, Vec3::Z, 1).len(), 1);
        assert!(sample_grid(Vec3::ZERO, Vec3::X, Vec3::Z, 0).is_empty());
    }

    // ── Total illuminance ───────────────────────────────────────────────────

    fn small_overhead_light() -> AreaLight {
        // A 1x1 emitter centred above the origin at height 5.
        AreaLight::new(Vec3::new(-0.5, 5.0, -0.5), Vec3::X, Vec3::Z, 8, 2)
    }

    #[test]
    fn unoccluded_early_out_matches_full_sampling_within_2_percent() {
        let area = small_overhead_light();
        let p = Vec3::new(0.0, 1e-4, 0.0);
        let n = Vec3::Y;
        let objects: Vec<Object> = Vec::new();

        let mut accelerated = default_options();
        accelerated.area_light_acceleration = true;
        let mut full = default_options();
        full.area_light_acceleration = false;

        let fast = area.total_illuminance(Vec3::ONE, 100.0, p, n, &objects, &accelerated);
        let slow = area.total_illuminance(Vec3::ONE, 100.0, p, n, &objects, &full);
        assert!(fast.x > 0.0 && slow.x > 0.0);
        let rel = (fast.x - slow.x).abs() / slow.x;
        assert!(rel < 0.02, "early out deviates by {rel}");
    }

    #[test]
    fn fully_occluded_returns_black() {
        let area = small_overhead_light();
        // A big opaque sphere between the surface point and the emitter.
        let objects = vec![blocker_sphere(Vec3::new(0.0, 2.5, 0.0), 2.0)];
        let p = Vec3::new(0.0, 1e-4, 0.0);
        let out =
            area.total_illuminance(Vec3::ONE, 100.0, p, Vec3::Y, &objects, &default_options());
        assert_eq!(out, Vec3::ZERO);
    }

    #[test]
    fn occluder_beyond_the_light_does_not_block() {
        let area = small_overhead_light();
        // A plane far above the emitter; shadow rays must stop at the light.
        let objects = vec![Object::new(
            Surface::new(Vec3::ONE, Vec3::new(0.0, 50.0, 0.0)),
            Shape::Plane { normal: Vec3::Y },
        )];
        let p = Vec3::new(0.0, 1e-4, 0.0);
        let out =
            area.total_illuminance(Vec3::ONE, 100.0, p, Vec3::Y, &objects, &default_options());
        assert!(out.x > 0.0, "geometry beyond the emitter must not occlude");
    }

    #[test]
    fn transparent_blocker_casts_no_shadow() {
        let area = small_overhead_light();
        let mut blocker = blocker_sphere(Vec3::new(0.0, 2.5, 0.0), 2.0);
        blocker.surface.material = Material::Transparent { ior: 1.5 };
        let objects = vec![blocker];
        let p = Vec3::new(0.0, 1e-4, 0.0);
        let out =
            area.total_illuminance(Vec3::ONE, 100.0, p, Vec3::Y, &objects, &default_options());
        assert!(out.x > 0.0);
    }

    #[test]
    fn mixed_visibility_falls_back_to_full_sampling() {
        // Occlude one corner of the emitter only; the result must still be
        // a proper partial value, between black and the unoccluded answer.
        let area = small_overhead_light();
        let objects = vec![blocker_sphere(Vec3::new(-0.5, 2.5, -0.5), 0.8)];
        let p = Vec3::new(0.0, 1e-4, 0.0);
        let opts = default_options();
        let partial = area.total_illuminance(Vec3::ONE, 100.0, p, Vec3::Y, &objects, &opts);
        let open = area.total_illuminance(Vec3::ONE, 100.0, p, Vec3::Y, &[], &opts);
        assert!(partial.x > 0.0);
        assert!(partial.x < open.x);
    }
}
