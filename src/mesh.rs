use std::path::Path;

use glam::{Mat3, Vec3};

use crate::bvh::{Bvh, MeshHit, Triangle};
use crate::scene::SceneError;

/// A triangle mesh with its spatial accelerator.
///
/// The mesh owns its triangles; the BVH stores indices into that buffer.
/// Vertices are transformed into world space once at load time, so rays are
/// intersected without any per-ray transform.
pub struct Mesh {
    pub size: Vec3,
    pub rot: Vec3,
    pub triangles: Vec<Triangle>,
    accel: Bvh,
}

impl Mesh {
    /// Wrap an existing triangle buffer, building the accelerator.
    pub fn from_triangles(triangles: Vec<Triangle>, leaf_penalty: u32) -> Self {
        let accel = Bvh::build(&triangles, leaf_penalty);
        Self {
            size: Vec3::ONE,
            rot: Vec3::ZERO,
            triangles,
            accel,
        }
    }

    /// Load a Wavefront OBJ file and place it in the world.
    ///
    /// Vertices are scaled by `size`, rotated by `rot` (degrees, applied as
    /// Rz then Ry then Rx composed) and translated by `position`. Vertex
    /// normals are used when the file provides them, the face normal
    /// otherwise. N-gons are triangulated by the loader.
    pub fn load(
        path: &Path,
        position: Vec3,
        size: Vec3,
        rot: Vec3,
        leaf_penalty: u32,
    ) -> Result<Self, SceneError> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )
        .map_err(|source| SceneError::Mesh {
            path: path.to_path_buf(),
            source,
        })?;

        let rotation = Mat3::from_rotation_z(rot.z.to_radians())
            * Mat3::from_rotation_y(rot.y.to_radians())
            * Mat3::from_rotation_x(rot.x.to_radians());

        let mut triangles = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            let has_normals = !mesh.normals.is_empty();

            let vertex = |idx: u32| -> Result<Vec3, SceneError> {
                let i = idx as usize * 3;
                let v = mesh
                    .positions
                    .get(i..i + 3)
                    .ok_or_else(|| malformed(path, model, "vertex index out of range"))?;
                Ok(rotation * (Vec3::new(v[0], v[1], v[2]) * size) + position)
            };
            let normal = |idx: u32| -> Result<Vec3, SceneError> {
                let i = idx as usize * 3;
                let n = mesh
                    .normals
                    .get(i..i + 3)
                    .ok_or_else(|| malformed(path, model, "normal index out of range"))?;
                Ok(rotation * Vec3::new(n[0], n[1], n[2]))
            };

            for face in mesh.indices.chunks_exact(3) {
                let (a, b, c) = (vertex(face[0])?, vertex(face[1])?, vertex(face[2])?);
                let tri = if has_normals {
                    Triangle::with_normals(
                        a,
                        b,
                        c,
                        normal(face[0])?,
                        normal(face[1])?,
                        normal(face[2])?,
                    )
                } else {
                    Triangle::new(a, b, c)
                };
                triangles.push(tri);
            }
        }

        if triangles.is_empty() {
            return Err(SceneError::MalformedMesh {
                path: path.to_path_buf(),
                message: "mesh contains no triangles".to_string(),
            });
        }

        tracing::debug!(
            path = %path.display(),
            triangles = triangles.len(),
            "mesh loaded"
        );

        let mut mesh = Self::from_triangles(triangles, leaf_penalty);
        mesh.size = size;
        mesh.rot = rot;
        Ok(mesh)
    }

    /// Nearest triangle hit, delegated to the accelerator.
    pub fn intersect(&self, origin: Vec3, direction: Vec3, cull: bool) -> Option<MeshHit> {
        self.accel.intersect(&self.triangles, origin, direction, cull)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

fn malformed(path: &Path, model: &tobj::Model, message: &str) -> SceneError {
    SceneError::MalformedMesh {
        path: path.to_path_buf(),
        message: format!("model '{}': {}", model.name, message),
    }
}
