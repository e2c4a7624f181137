use std::path::{Path, PathBuf};

use glam::{Mat3, Vec3};
use thiserror::Error;

use crate::bvh::Ray;
use crate::light::Light;
use crate::object::Object;
use crate::parser;
use crate::skybox::Skybox;

/// Errors raised while building a scene. All of them surface before any
/// render worker is spawned.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scene file line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("failed to load mesh {}", path.display())]
    Mesh {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("malformed mesh {}: {message}", path.display())]
    MalformedMesh { path: PathBuf, message: String },
    #[error("failed to load skybox face {}", path.display())]
    Skybox {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("skybox face {} does not match the other faces' dimensions", path.display())]
    SkyboxDimensions { path: PathBuf },
    #[error("failed to write image {}", path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Render settings, immutable once the scene is built.
#[derive(Clone, Debug)]
pub struct Options {
    pub width: usize,
    pub height: usize,
    /// Horizontal field of view in degrees.
    pub fov: f32,
    /// Offset applied along the surface normal to avoid self-intersection.
    pub bias: f32,
    pub max_ray_depth: u32,
    pub n_workers: usize,
    pub background_color: Vec3,
    /// Scales the BVH leaf threshold; larger values mean fewer, bigger
    /// leaves.
    pub ac_penalty: u32,
    pub image_name: String,
    pub area_light_acceleration: bool,
    pub backface_culling: bool,
    pub show_progress: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            fov: 90.0,
            bias: 1e-4,
            max_ray_depth: 5,
            n_workers: 8,
            background_color: Vec3::ZERO,
            ac_penalty: 1,
            image_name: "out.bmp".to_string(),
            area_light_acceleration: true,
            backface_culling: false,
            show_progress: true,
        }
    }
}

/// Pinhole camera with a fixed pose.
///
/// The rotation matrix is composed once at construction; the parallel
/// renderer only ever reads it.
pub struct Camera {
    pub pos: Vec3,
    /// Rotation in degrees about x, y, z.
    pub rot: Vec3,
    rotation: Mat3,
}

impl Camera {
    pub fn new(pos: Vec3, rot: Vec3) -> Self {
        let rotation = Mat3::from_rotation_z(rot.z.to_radians())
            * Mat3::from_rotation_y(rot.y.to_radians())
            * Mat3::from_rotation_x(rot.x.to_radians());
        Self { pos, rot, rotation }
    }

    /// Primary ray through the image-plane point `(xp, yp)`; the image plane
    /// sits at z = -1 in camera space.
    pub fn ray(&self, xp: f32, yp: f32) -> Ray {
        let dir = self.rotation * Vec3::new(xp, yp, -1.0).normalize();
        Ray::primary(self.pos, dir)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

/// A fully built scene: read-only while rendering, safe to share across
/// worker threads by reference.
pub struct Scene {
    pub options: Options,
    pub camera: Camera,
    pub objects: Vec<Object>,
    pub lights: Vec<Light>,
    pub skybox: Option<Skybox>,
}

impl Scene {
    /// Parse a scene description file and load everything it references
    /// (meshes next to the scene file, skybox faces from the same
    /// directory).
    pub fn load(path: &Path) -> Result<Scene, SceneError> {
        tracing::info!(path = %path.display(), "loading scene");
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut scene = parser::parse(&text, dir)?;
        scene.skybox = Skybox::load(dir)?;
        tracing::info!(
            objects = scene.objects.len(),
            lights = scene.lights.len(),
            skybox = scene.skybox.is_some(),
            "scene ready"
        );
        Ok(scene)
    }

    /// Environment colour for a ray that escaped the scene.
    pub fn sample_background(&self, dir: Vec3) -> Vec3 {
        match &self.skybox {
            Some(skybox) => skybox.sample(dir),
            None => self.options.background_color,
        }
    }
}
