use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};

use crate::bvh::{Ray, RayKind};
use crate::light::LightKind;
use crate::object::{Material, Object};
use crate::scene::{Scene, SceneError};
use crate::stats;

/// Reflect `dir` about `normal`.
pub fn reflect(dir: Vec3, normal: Vec3) -> Vec3 {
    dir - 2.0 * dir.dot(normal) * normal
}

/// Refract `dir` through a surface with the given index of refraction,
/// handling both entering and exiting rays. Returns the zero vector on
/// total internal reflection; callers gate on the Fresnel term instead.
pub fn refract(dir: Vec3, normal: Vec3, ior: f32) -> Vec3 {
    let mut n1 = 1.0;
    let mut n2 = ior;
    let mut cosi = dir.dot(normal).clamp(-1.0, 1.0);
    let mut n = normal;
    if cosi < 0.0 {
        cosi = -cosi;
    } else {
        std::mem::swap(&mut n1, &mut n2);
        n = -normal;
    }
    let eta = n1 / n2;
    let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
    if k < 0.0 {
        return Vec3::ZERO;
    }
    eta * dir + (eta * cosi - k.sqrt()) * n
}

/// Fresnel reflectance for an unpolarised ray, averaging the s and p
/// polarisations exactly. Returns 1 on total internal reflection.
pub fn fresnel(dir: Vec3, normal: Vec3, ior: f32) -> f32 {
    let mut n1 = 1.0;
    let mut n2 = ior;
    let mut cosi = dir.dot(normal).clamp(-1.0, 1.0);
    if cosi > 0.0 {
        std::mem::swap(&mut n1, &mut n2);
    }
    let sint = n1 / n2 * (1.0 - cosi * cosi).max(0.0).sqrt();
    if sint >= 1.0 {
        return 1.0;
    }
    let cost = (1.0 - sint * sint).max(0.0).sqrt();
    cosi = cosi.abs();
    let rs = (n2 * cosi - n1 * cost) / (n2 * cosi + n1 * cost);
    let rp = (n1 * cosi - n2 * cost) / (n1 * cosi + n2 * cost);
    (rs * rs + rp * rp) / 2.0
}

/// Nearest hit along a ray across the whole object list.
pub struct RayHit<'a> {
    pub object: &'a Object,
    pub t: f32,
    pub tri: Option<usize>,
    pub uv: Vec2,
}

/// Scan every object and keep the closest hit below `t_max`.
///
/// Shadow rays pass through transparent objects: glass casting a hard
/// shadow looks worse than it casting none.
pub fn trace<'a>(
    ray: &Ray,
    objects: &'a [Object],
    t_max: f32,
    cull: bool,
) -> Option<RayHit<'a>> {
    let mut nearest: Option<RayHit<'a>> = None;
    let mut limit = t_max;
    for object in objects {
        if ray.kind == RayKind::Shadow
            && matches!(object.surface.material, Material::Transparent { .. })
        {
            continue;
        }
        if let Some(hit) = object.intersect(ray, cull) {
            if hit.t < limit {
                limit = hit.t;
                nearest = Some(RayHit {
                    object,
                    t: hit.t,
                    tri: hit.tri,
                    uv: hit.uv,
                });
            }
        }
    }
    nearest
}

/// Shade a ray, recursing for reflection and refraction until the depth
/// budget runs out. A ray that escapes the scene or exhausts its depth
/// returns the environment colour.
pub fn cast_ray(ray: &Ray, scene: &Scene, depth: u32) -> Vec3 {
    stats::count_ray_cast();
    let options = &scene.options;
    if depth > options.max_ray_depth {
        return scene.sample_background(ray.direction);
    }
    let Some(hit) = trace(ray, &scene.objects, f32::INFINITY, options.backface_culling) else {
        return scene.sample_background(ray.direction);
    };

    let hit_point = ray.origin + ray.direction * hit.t;
    let (normal, tex) = hit.object.surface_data(hit_point, hit.tri, hit.uv);
    let object_color = hit.object.surface.color;

    match hit.object.surface.material {
        Material::Diffuse => {
            let mut color = Vec3::ZERO;
            for light in &scene.lights {
                match &light.kind {
                    LightKind::Area(area) => {
                        color += object_color
                            * area.total_illuminance(
                                light.color,
                                light.intensity,
                                hit_point + normal * options.bias,
                                normal,
                                &scene.objects,
                                options,
                            );
                    }
                    _ => {
                        let ill = light.illuminate(hit_point);
                        let shadow = Ray::shadow(hit_point + normal * options.bias, -ill.dir);
                        let visible = trace(
                            &shadow,
                            &scene.objects,
                            ill.distance,
                            options.backface_culling,
                        )
                        .is_none();
                        if visible {
                            let pattern = hit.object.surface.pattern.weight(tex);
                            color += object_color
                                * ill.intensity
                                * pattern
                                * normal.dot(-ill.dir).max(0.0);
                        }
                    }
                }
            }
            color
        }
        Material::Phong {
            ambient,
            diffuse,
            specular,
            exponent,
        } => {
            let mut diffuse_acc = Vec3::ZERO;
            let mut specular_acc = Vec3::ZERO;
            for light in &scene.lights {
                let ill = light.illuminate(hit_point);
                let shadow = Ray::shadow(hit_point + normal * options.bias, -ill.dir);
                let visible = trace(
                    &shadow,
                    &scene.objects,
                    ill.distance,
                    options.backface_culling,
                )
                .is_none();
                if !visible {
                    continue;
                }
                diffuse_acc += diffuse * ill.intensity * normal.dot(-ill.dir).max(0.0);
                let r = reflect(ill.dir, normal);
                specular_acc +=
                    specular * ill.intensity * r.dot(-ray.direction).max(0.0).powf(exponent);
            }
            (object_color * ambient + diffuse_acc + specular_acc)
                * hit.object.surface.pattern.weight(tex)
        }
        Material::Reflective => {
            let reflected = Ray::primary(
                hit_point + normal * options.bias,
                reflect(ray.direction, normal),
            );
            cast_ray(&reflected, scene, depth + 1) * 0.8
        }
        Material::Transparent { ior } => {
            let kr = fresnel(ray.direction, normal, ior);
            let outside = ray.direction.dot(normal) < 0.0;
            let bias = normal * options.bias;
            let mut color = Vec3::ZERO;
            if kr < 1.0 {
                let refraction_dir = refract(ray.direction, normal, ior).normalize_or_zero();
                let refraction_origin = if outside {
                    hit_point - bias
                } else {
                    hit_point + bias
                };
                let refracted = Ray::primary(refraction_origin, refraction_dir);
                color += cast_ray(&refracted, scene, depth + 1) * (1.0 - kr);
            }
            let reflection_dir = reflect(ray.direction, normal).normalize_or_zero();
            let reflection_origin = if outside {
                hit_point + bias
            } else {
                hit_point - bias
            };
            let reflected = Ray::primary(reflection_origin, reflection_dir);
            color + cast_ray(&reflected, scene, depth + 1) * kr
        }
    }
}

/// Shared render progress, incremented with relaxed ordering from every
/// worker and polled by the reporter on the main thread.
#[derive(Default)]
pub struct Progress {
    pub finished_pixels: AtomicUsize,
    pub finished_workers: AtomicUsize,
}

/// Render the scene into a fresh framebuffer of `width * height` pixels,
/// row-major.
///
/// The image is cut into one horizontal stripe per worker; stripes are
/// disjoint `&mut` slices, so the workers share nothing but the read-only
/// scene and the progress counters. Joining the scope publishes all pixel
/// writes to the caller.
pub fn render(scene: &Scene) -> Vec<Vec3> {
    let options = &scene.options;
    let (width, height) = (options.width, options.height);
    let workers = options.n_workers.max(1);
    let mut framebuffer = vec![Vec3::ZERO; width * height];
    let progress = Progress::default();
    let rows_per_worker = height / workers;

    let started = Instant::now();
    std::thread::scope(|scope| {
        let mut rest = framebuffer.as_mut_slice();
        for i in 0..workers {
            let y0 = i * rows_per_worker;
            // The last worker picks up the remainder rows.
            let rows = if i + 1 == workers {
                height - y0
            } else {
                rows_per_worker
            };
            let (stripe, tail) = rest.split_at_mut(rows * width);
            rest = tail;
            let progress = &progress;
            scope.spawn(move || render_stripe(scene, stripe, y0, rows, progress));
        }

        if options.show_progress {
            report_progress(&progress, width * height, workers);
        }
    });
    tracing::info!(
        width,
        height,
        workers,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "render finished"
    );

    framebuffer
}

fn render_stripe(
    scene: &Scene,
    stripe: &mut [Vec3],
    y0: usize,
    rows: usize,
    progress: &Progress,
) {
    let options = &scene.options;
    let scale = (options.fov.to_radians() * 0.5).tan();
    let aspect = options.width as f32 / options.height as f32;
    for dy in 0..rows {
        let y = y0 + dy;
        for x in 0..options.width {
            let xp = (2.0 * (x as f32 + 0.5) / options.width as f32 - 1.0) * scale * aspect;
            let yp = -(2.0 * (y as f32 + 0.5) / options.height as f32 - 1.0) * scale;
            let ray = scene.camera.ray(xp, yp);
            stripe[dy * options.width + x] = cast_ray(&ray, scene, 0);
            progress.finished_pixels.fetch_add(1, Ordering::Relaxed);
        }
    }
    progress.finished_workers.fetch_add(1, Ordering::Relaxed);
}

/// Poll the counters about once a second until every worker has finished.
fn report_progress(progress: &Progress, total_pixels: usize, workers: usize) {
    let bar = ProgressBar::new(total_pixels as u64);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {wide_bar} {percent:>3}%")
            .expect("static progress template")
            .progress_chars("##-"),
    );
    while progress.finished_workers.load(Ordering::Relaxed) != workers {
        std::thread::sleep(Duration::from_secs(1));
        bar.set_position(progress.finished_pixels.load(Ordering::Relaxed) as u64);
    }
    bar.finish_and_clear();
}

/// Write a framebuffer as an 8-bit RGB image. Values are clamped to [0, 1]
/// and scaled linearly; the format follows the file extension.
pub fn write_image(
    framebuffer: &[Vec3],
    width: usize,
    height: usize,
    path: &Path,
) -> Result<(), SceneError> {
    let mut img = RgbImage::new(width as u32, height as u32);
    for y in 0..height {
        for x in 0..width {
            let px = framebuffer[y * width + x];
            img.put_pixel(x as u32, y as u32, Rgb([to_u8(px.x), to_u8(px.y), to_u8(px.z)]));
        }
    }
    img.save(path).map_err(|source| SceneError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}
