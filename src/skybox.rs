use std::path::Path;

use glam::Vec3;

use crate::scene::SceneError;

/// Face order: left, front, right, back, top, bottom.
const FACE_NAMES: [&str; 6] = [
    "box_left.bmp",
    "box_front.bmp",
    "box_right.bmp",
    "box_back.bmp",
    "box_top.bmp",
    "box_bottom.bmp",
];

const LEFT: usize = 0;
const FRONT: usize = 1;
const RIGHT: usize = 2;
const BACK: usize = 3;
const TOP: usize = 4;
const BOTTOM: usize = 5;

/// Six cube-face textures sampled by ray direction when nothing is hit.
pub struct Skybox {
    faces: [Vec<Vec3>; 6],
    width: usize,
    height: usize,
}

impl Skybox {
    /// Load the six fixed-name face bitmaps from `dir`.
    ///
    /// Returns `Ok(None)` when no skybox is present (any face missing);
    /// a face that exists but cannot be decoded is an error.
    pub fn load(dir: &Path) -> Result<Option<Skybox>, SceneError> {
        let paths: Vec<_> = FACE_NAMES.iter().map(|name| dir.join(name)).collect();
        if !paths.iter().all(|p| p.exists()) {
            return Ok(None);
        }

        let mut faces: [Vec<Vec3>; 6] = Default::default();
        let mut width = 0usize;
        let mut height = 0usize;
        for (k, path) in paths.iter().enumerate() {
            let img = image::open(path)
                .map_err(|source| SceneError::Skybox {
                    path: path.clone(),
                    source,
                })?
                .to_rgb8();
            let (w, h) = img.dimensions();
            if k == 0 {
                width = w as usize;
                height = h as usize;
            } else if (w as usize, h as usize) != (width, height) {
                return Err(SceneError::SkyboxDimensions { path: path.clone() });
            }
            faces[k] = img
                .pixels()
                .map(|px| Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32) / 256.0)
                .collect();
        }

        tracing::debug!(width, height, "skybox loaded");
        Ok(Some(Skybox {
            faces,
            width,
            height,
        }))
    }

    /// Build a skybox from in-memory face buffers, in the fixed face order.
    pub fn from_faces(faces: [Vec<Vec3>; 6], width: usize, height: usize) -> Self {
        Self {
            faces,
            width,
            height,
        }
    }

    /// Nearest-neighbour sample in the direction `dir` (unit length).
    ///
    /// The dominant axis selects the face; the remaining two components are
    /// projected onto it and mapped from [-1, 1] into pixel coordinates.
    pub fn sample(&self, dir: Vec3) -> Vec3 {
        let ax = dir.x.abs();
        let ay = dir.y.abs();
        let az = dir.z.abs();
        let max = ax.max(ay).max(az);
        if max == 0.0 {
            return Vec3::ZERO;
        }

        let (face, proj_u, proj_v) = if max == az {
            let p = dir / az;
            if dir.z < 0.0 {
                (FRONT, p.x, p.y)
            } else {
                (BACK, -p.x, p.y)
            }
        } else if max == ax {
            let p = dir / ax;
            if dir.x < 0.0 {
                (LEFT, -p.z, p.y)
            } else {
                (RIGHT, p.z, p.y)
            }
        } else {
            let p = dir / ay;
            if dir.y < 0.0 {
                (BOTTOM, p.x, p.z)
            } else {
                (TOP, p.x, p.z)
            }
        };

        let j = self.to_pixel(proj_u, self.width);
        let i = self.to_pixel(proj_v, self.height);
        self.faces[face][i * self.width + j]
    }

    fn to_pixel(&self, v: f32, max: usize) -> usize {
        let scaled = (v + 1.0) / 2.0 * max as f32;
        (scaled as isize).clamp(0, max as isize - 1) as usize
    }
}
