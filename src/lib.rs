//! Offline CPU ray tracer.
//!
//! A scene is described by a small block-structured text format referencing
//! Wavefront OBJ meshes and an optional six-face BMP skybox. Primary rays
//! are traced against analytic primitives and BVH-accelerated triangle
//! meshes, shaded recursively (diffuse, Phong, mirror reflection, Fresnel
//! refraction, sampled area lights) and written out as an RGB image.
//!
//! Rendering is embarrassingly parallel: the image is split into one row
//! stripe per OS thread, the scene is shared read-only, and progress is
//! published through atomic counters.

pub mod bvh;
pub mod light;
pub mod mesh;
pub mod object;
pub mod parser;
pub mod render;
pub mod scene;
pub mod skybox;
pub mod stats;

pub use bvh::{Aabb, Bvh, MeshHit, Ray, RayKind, Triangle};
pub use light::{AreaLight, Illumination, Light, LightKind};
pub use mesh::Mesh;
pub use object::{Material, Object, ObjectHit, Pattern, Shape, Surface};
pub use render::{
    cast_ray, fresnel, reflect, refract, render, trace, write_image, Progress, RayHit,
};
pub use scene::{Camera, Options, Scene, SceneError};
pub use skybox::Skybox;
