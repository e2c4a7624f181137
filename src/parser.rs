//! Text scene description parser.
//!
//! The format is block structured: `[options]`, `[light]`, `[object]` and
//! `[end]` headers on their own lines, `key=value` pairs inside a block.
//! `#` starts a comment; `#[` comments out everything until the next block
//! header. Unknown keys are tolerated so scene files can carry hints for
//! other tools.

use std::path::Path;

use glam::Vec3;

use crate::light::{AreaLight, Light};
use crate::mesh::Mesh;
use crate::object::{Material, Object, Pattern, Shape, Surface};
use crate::scene::{Camera, Options, Scene, SceneError};

pub fn parse(text: &str, dir: &Path) -> Result<Scene, SceneError> {
    let mut options = Options::default();
    let mut camera_pos = Vec3::ZERO;
    let mut camera_rot = Vec3::ZERO;
    let mut lights = Vec::new();
    let mut objects = Vec::new();
    let mut block = Block::None;
    let mut skipping = false;
    let mut last_line = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        last_line = line_no;
        let mut line = raw.trim();
        if line.is_empty() {
            continue;
        }

        // A commented-out block swallows everything until the next header.
        if line.starts_with("#[") {
            finish_block(
                std::mem::replace(&mut block, Block::None),
                &mut lights,
                &mut objects,
                dir,
                &options,
                line_no,
            )?;
            skipping = true;
            continue;
        }
        if skipping {
            if line.starts_with('[') {
                skipping = false;
            } else {
                continue;
            }
        }

        if let Some(pos) = line.find('#') {
            line = line[..pos].trim_end();
            if line.is_empty() {
                continue;
            }
        }

        if line.starts_with('[') {
            finish_block(
                std::mem::replace(&mut block, Block::None),
                &mut lights,
                &mut objects,
                dir,
                &options,
                line_no,
            )?;
            match line {
                "[options]" => block = Block::Options,
                "[light]" => block = Block::Light(LightBuilder::new()),
                "[object]" => block = Block::Object(ObjectBuilder::new()),
                "[end]" => break,
                other => {
                    return Err(parse_err(line_no, format!("unknown block header '{other}'")))
                }
            }
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| parse_err(line_no, "expected key=value".to_string()))?;
        let key = key.trim();
        let value = value.trim();
        match &mut block {
            Block::None => {
                return Err(parse_err(line_no, format!("key '{key}' outside of any block")))
            }
            Block::Options => apply_option(
                &mut options,
                &mut camera_pos,
                &mut camera_rot,
                key,
                value,
                line_no,
            )?,
            Block::Light(builder) => builder.set(key, value, line_no)?,
            Block::Object(builder) => builder.set(key, value, line_no)?,
        }
    }

    finish_block(
        std::mem::replace(&mut block, Block::None),
        &mut lights,
        &mut objects,
        dir,
        &options,
        last_line,
    )?;

    Ok(Scene {
        camera: Camera::new(camera_pos, camera_rot),
        options,
        objects,
        lights,
        skybox: None,
    })
}

enum Block {
    None,
    Options,
    Light(LightBuilder),
    Object(ObjectBuilder),
}

fn finish_block(
    block: Block,
    lights: &mut Vec<Light>,
    objects: &mut Vec<Object>,
    dir: &Path,
    options: &Options,
    line_no: usize,
) -> Result<(), SceneError> {
    match block {
        Block::None | Block::Options => {}
        Block::Light(builder) => lights.push(builder.build(line_no)?),
        Block::Object(builder) => objects.push(builder.build(dir, options, line_no)?),
    }
    Ok(())
}

fn apply_option(
    options: &mut Options,
    camera_pos: &mut Vec3,
    camera_rot: &mut Vec3,
    key: &str,
    value: &str,
    line_no: usize,
) -> Result<(), SceneError> {
    match key {
        "width" => options.width = parse_num(value, line_no)?,
        "height" => options.height = parse_num(value, line_no)?,
        "fov" => options.fov = parse_num(value, line_no)?,
        "bias" => options.bias = parse_num(value, line_no)?,
        "n_workers" => options.n_workers = parse_num(value, line_no)?,
        "max_ray_depth" => options.max_ray_depth = parse_num(value, line_no)?,
        "ac_penalty" => options.ac_penalty = parse_num(value, line_no)?,
        "image_name" => options.image_name = value.to_string(),
        "background_color" => options.background_color = parse_vec3(value, line_no)?,
        "position" => *camera_pos = parse_vec3(value, line_no)?,
        "rotation" => *camera_rot = parse_vec3(value, line_no)?,
        _ => {}
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LightType {
    Distant,
    Point,
    Area,
}

struct LightBuilder {
    kind: Option<LightType>,
    color: Vec3,
    intensity: f32,
    direction: Option<Vec3>,
    position: Option<Vec3>,
    pos: Option<Vec3>,
    i: Option<Vec3>,
    j: Option<Vec3>,
    samples: u32,
    base_samples: u32,
}

impl LightBuilder {
    fn new() -> Self {
        Self {
            kind: None,
            color: Vec3::ONE,
            intensity: 1.0,
            direction: None,
            position: None,
            pos: None,
            i: None,
            j: None,
            samples: 8,
            base_samples: 2,
        }
    }

    fn set(&mut self, key: &str, value: &str, line_no: usize) -> Result<(), SceneError> {
        match key {
            "type" => {
                self.kind = Some(match value {
                    "distant" => LightType::Distant,
                    "point" => LightType::Point,
                    "area" => LightType::Area,
                    other => {
                        return Err(parse_err(line_no, format!("unknown light type '{other}'")))
                    }
                });
                return Ok(());
            }
            "color" => self.color = parse_vec3(value, line_no)?,
            "intensity" => self.intensity = parse_num(value, line_no)?,
            _ => {
                let kind = self
                    .kind
                    .ok_or_else(|| parse_err(line_no, "light type missing".to_string()))?;
                match (kind, key) {
                    (LightType::Distant, "direction") => {
                        self.direction = Some(parse_vec3(value, line_no)?)
                    }
                    (LightType::Point, "position") => {
                        self.position = Some(parse_vec3(value, line_no)?)
                    }
                    (LightType::Area, "pos") => self.pos = Some(parse_vec3(value, line_no)?),
                    (LightType::Area, "i") => self.i = Some(parse_vec3(value, line_no)?),
                    (LightType::Area, "j") => self.j = Some(parse_vec3(value, line_no)?),
                    (LightType::Area, "samples") => self.samples = parse_num(value, line_no)?,
                    (LightType::Area, "base_samples") => {
                        self.base_samples = parse_num(value, line_no)?
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn build(self, line_no: usize) -> Result<Light, SceneError> {
        let missing = |what: &str| parse_err(line_no, format!("light is missing '{what}'"));
        match self.kind {
            None => Err(parse_err(line_no, "light type missing".to_string())),
            Some(LightType::Distant) => Ok(Light::distant(
                self.color,
                self.intensity,
                self.direction.ok_or_else(|| missing("direction"))?,
            )),
            Some(LightType::Point) => Ok(Light::point(
                self.color,
                self.intensity,
                self.position.ok_or_else(|| missing("position"))?,
            )),
            Some(LightType::Area) => Ok(Light::area(
                self.color,
                self.intensity,
                AreaLight::new(
                    self.pos.ok_or_else(|| missing("pos"))?,
                    self.i.ok_or_else(|| missing("i"))?,
                    self.j.ok_or_else(|| missing("j"))?,
                    self.samples,
                    self.base_samples,
                ),
            )),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ObjectType {
    Plane,
    Sphere,
    Mesh,
}

struct ObjectBuilder {
    kind: Option<ObjectType>,
    color: Vec3,
    pos: Vec3,
    pattern: Pattern,
    material: Material,
    radius: Option<f32>,
    normal: Option<Vec3>,
    size: Vec3,
    rot: Vec3,
    name: Option<String>,
}

impl ObjectBuilder {
    fn new() -> Self {
        Self {
            kind: None,
            color: Vec3::ONE,
            pos: Vec3::ZERO,
            pattern: Pattern::Solid,
            material: Material::Diffuse,
            radius: None,
            normal: None,
            size: Vec3::ONE,
            rot: Vec3::ZERO,
            name: None,
        }
    }

    fn set(&mut self, key: &str, value: &str, line_no: usize) -> Result<(), SceneError> {
        match key {
            "type" => {
                self.kind = Some(match value {
                    "plane" => ObjectType::Plane,
                    "sphere" => ObjectType::Sphere,
                    "mesh" => ObjectType::Mesh,
                    other => {
                        return Err(parse_err(line_no, format!("unknown object type '{other}'")))
                    }
                });
                return Ok(());
            }
            "color" => self.color = parse_vec3(value, line_no)?,
            "pos" => self.pos = parse_vec3(value, line_no)?,
            "pattern" => match value {
                "chessboard" => self.pattern = Pattern::Chessboard,
                other => {
                    return Err(parse_err(line_no, format!("unknown pattern '{other}'")))
                }
            },
            "material" => self.material = parse_material(value, line_no)?,
            _ => {
                let kind = self
                    .kind
                    .ok_or_else(|| parse_err(line_no, "object type missing".to_string()))?;
                match (kind, key) {
                    (ObjectType::Sphere, "radius") => {
                        self.radius = Some(parse_num(value, line_no)?)
                    }
                    (ObjectType::Plane, "normal") => {
                        self.normal = Some(parse_vec3(value, line_no)?)
                    }
                    (ObjectType::Mesh, "size") => self.size = parse_vec3(value, line_no)?,
                    (ObjectType::Mesh, "rot") => self.rot = parse_vec3(value, line_no)?,
                    (ObjectType::Mesh, "name") => self.name = Some(value.to_string()),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn build(self, dir: &Path, options: &Options, line_no: usize) -> Result<Object, SceneError> {
        let missing = |what: &str| parse_err(line_no, format!("object is missing '{what}'"));
        let kind = self
            .kind
            .ok_or_else(|| parse_err(line_no, "object type missing".to_string()))?;
        let shape = match kind {
            ObjectType::Sphere => {
                let radius = self.radius.ok_or_else(|| missing("radius"))?;
                Shape::Sphere {
                    radius,
                    radius2: radius * radius,
                }
            }
            ObjectType::Plane => Shape::Plane {
                normal: self.normal.ok_or_else(|| missing("normal"))?.normalize(),
            },
            ObjectType::Mesh => {
                let name = self.name.ok_or_else(|| missing("name"))?;
                let mesh = Mesh::load(
                    &dir.join(name),
                    self.pos,
                    self.size,
                    self.rot,
                    options.ac_penalty,
                )?;
                Shape::Mesh(mesh)
            }
        };
        let mut surface = Surface::new(self.color, self.pos);
        surface.pattern = self.pattern;
        surface.material = self.material;
        Ok(Object::new(surface, shape))
    }
}

fn parse_material(value: &str, line_no: usize) -> Result<Material, SceneError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    match parts[0] {
        "diffuse" => Ok(Material::Diffuse),
        "reflective" => Ok(Material::Reflective),
        "transparent" => {
            let ior = parts
                .get(1)
                .copied()
                .ok_or_else(|| {
                    parse_err(
                        line_no,
                        "transparent material requires an index of refraction".to_string(),
                    )
                })
                .and_then(|v| parse_num(v, line_no))?;
            Ok(Material::Transparent { ior })
        }
        "phong" => {
            if parts.len() != 5 {
                return Err(parse_err(
                    line_no,
                    "phong material requires ambient,diffuse,specular,exponent".to_string(),
                ));
            }
            Ok(Material::Phong {
                ambient: parse_num(parts[1], line_no)?,
                diffuse: parse_num(parts[2], line_no)?,
                specular: parse_num(parts[3], line_no)?,
                exponent: parse_num(parts[4], line_no)?,
            })
        }
        other => Err(parse_err(line_no, format!("unknown material '{other}'"))),
    }
}

fn parse_num<T: std::str::FromStr>(value: &str, line_no: usize) -> Result<T, SceneError> {
    value
        .parse()
        .map_err(|_| parse_err(line_no, format!("invalid number '{value}'")))
}

fn parse_vec3(value: &str, line_no: usize) -> Result<Vec3, SceneError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(parse_err(
            line_no,
            format!("expected three comma separated values, got '{value}'"),
        ));
    }
    Ok(Vec3::new(
        parse_num(parts[0], line_no)?,
        parse_num(parts[1], line_no)?,
        parse_num(parts[2], line_no)?,
    ))
}

fn parse_err(line: usize, message: String) -> SceneError {
    SceneError::Parse { line, message }
}
