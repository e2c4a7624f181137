//! End-to-end rendering scenarios exercising the full pipeline: camera,
//! tracing, shading, skybox fallback and the parallel driver.

use glam::Vec3;
use helios_rt::{
    render, Camera, Light, Material, Object, Options, Scene, Shape, Skybox, Surface,
};

fn options(width: usize, height: usize) -> Options {
    Options {
        width,
        height,
        n_workers: 1,
        show_progress: false,
        ..Options::default()
    }
}

fn scene(options: Options, objects: Vec<Object>, lights: Vec<Light>) -> Scene {
    Scene {
        options,
        camera: Camera::default(),
        objects,
        lights,
        skybox: None,
    }
}

fn sphere(center: Vec3, radius: f32, material: Material) -> Object {
    let mut surface = Surface::new(Vec3::ONE, center);
    surface.material = material;
    Object::new(
        surface,
        Shape::Sphere {
            radius,
            radius2: radius * radius,
        },
    )
}

/// Six 1x1 faces with distinct grey levels, ordered left, front, right,
/// back, top, bottom.
fn probe_skybox() -> Skybox {
    Skybox::from_faces(
        [
            vec![Vec3::splat(0.1)],
            vec![Vec3::splat(0.2)],
            vec![Vec3::splat(0.3)],
            vec![Vec3::splat(0.4)],
            vec![Vec3::splat(0.5)],
            vec![Vec3::splat(0.6)],
        ],
        1,
        1,
    )
}

/// Primary ray directions exactly as the render driver generates them.
fn primary_directions(scene: &Scene) -> Vec<Vec3> {
    let opts = &scene.options;
    let scale = (opts.fov.to_radians() * 0.5).tan();
    let aspect = opts.width as f32 / opts.height as f32;
    let mut dirs = Vec::new();
    for y in 0..opts.height {
        for x in 0..opts.width {
            let xp = (2.0 * (x as f32 + 0.5) / opts.width as f32 - 1.0) * scale * aspect;
            let yp = -(2.0 * (y as f32 + 0.5) / opts.height as f32 - 1.0) * scale;
            dirs.push(scene.camera.ray(xp, yp).direction);
        }
    }
    dirs
}

#[test]
fn empty_scene_renders_the_background_everywhere() {
    let scene = scene(options(4, 4), Vec::new(), Vec::new());
    let framebuffer = render::render(&scene);
    assert_eq!(framebuffer.len(), 16);
    assert!(framebuffer.iter().all(|px| *px == Vec3::ZERO));
}

#[test]
fn lit_diffuse_sphere_has_a_bright_centre_pixel() {
    let objects = vec![sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, Material::Diffuse)];
    let lights = vec![Light::point(Vec3::ONE, 100.0, Vec3::new(0.0, 10.0, 0.0))];
    let scene = scene(options(3, 3), objects, lights);
    let framebuffer = render::render(&scene);
    let centre = framebuffer[4];
    assert!(centre.x > 0.0, "centre pixel must be lit, got {centre:?}");
}

#[test]
fn mirror_sphere_reflects_the_skybox_behind_the_camera() {
    let objects = vec![sphere(Vec3::ZERO, 1.0, Material::Reflective)];
    let mut scene = scene(options(3, 3), objects, Vec::new());
    scene.camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
    scene.skybox = Some(probe_skybox());
    let framebuffer = render::render(&scene);

    // The centre ray bounces straight back along +z onto the back face,
    // attenuated by the mirror.
    let expected = Vec3::splat(0.4) * 0.8;
    let centre = framebuffer[4];
    assert!(
        (centre - expected).length() < 1e-4,
        "expected {expected:?}, got {centre:?}"
    );
}

#[test]
fn skybox_alone_reproduces_the_sample_of_every_primary_ray() {
    let mut scene = scene(options(4, 4), Vec::new(), Vec::new());
    scene.skybox = Some(probe_skybox());
    let framebuffer = render::render(&scene);
    let dirs = primary_directions(&scene);
    let skybox = scene.skybox.as_ref().expect("skybox installed");
    for (px, dir) in framebuffer.iter().zip(&dirs) {
        assert_eq!(*px, skybox.sample(*dir));
    }
}

#[test]
fn zero_depth_budget_degrades_every_mirror_pixel_to_the_background() {
    // A mirror sphere wide enough to cover the whole 3x3 frustum.
    let objects = vec![sphere(Vec3::new(0.0, 0.0, -5.0), 4.0, Material::Reflective)];
    let mut opts = options(3, 3);
    opts.max_ray_depth = 0;
    opts.background_color = Vec3::new(0.5, 0.25, 0.125);
    let scene = scene(opts, objects, Vec::new());
    let framebuffer = render::render(&scene);
    let expected = scene.options.background_color * 0.8;
    for px in &framebuffer {
        assert!((*px - expected).length() < 1e-5, "got {px:?}");
    }
}

#[test]
fn worker_count_does_not_change_the_image() {
    let build_objects = || {
        vec![
            sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, Material::Diffuse),
            sphere(Vec3::new(1.5, 0.5, -6.0), 1.0, Material::Reflective),
            Object::new(
                Surface {
                    color: Vec3::ONE,
                    position: Vec3::new(0.0, -2.0, 0.0),
                    pattern: helios_rt::Pattern::Chessboard,
                    material: Material::Diffuse,
                },
                Shape::Plane { normal: Vec3::Y },
            ),
        ]
    };
    let build_lights = || {
        vec![
            Light::point(Vec3::ONE, 200.0, Vec3::new(0.0, 10.0, 0.0)),
            Light::distant(Vec3::new(1.0, 0.9, 0.8), 1.0, Vec3::new(-1.0, -1.0, 0.0)),
        ]
    };

    let mut reference: Option<Vec<Vec3>> = None;
    for workers in [1usize, 3, 5, 16] {
        let mut opts = options(16, 10);
        opts.n_workers = workers;
        let scene = Scene {
            options: opts,
            camera: Camera::default(),
            objects: build_objects(),
            lights: build_lights(),
            skybox: None,
        };
        let framebuffer = render::render(&scene);
        match &reference {
            None => reference = Some(framebuffer),
            Some(expected) => {
                assert_eq!(
                    expected, &framebuffer,
                    "framebuffer changed with {workers} workers"
                );
            }
        }
    }
}
