use glam::{Vec2, Vec3, Vec3A};

/// The maximum number of UV channels carried per mesh. The SIO2 format
/// reserves three texture channels per material.
pub const MAX_TEXTURE_CHANNELS: usize = 3;

/// Represents a 3D scene comprised of cameras, lamps, materials, images, and
/// meshes. It's the intermediary format between importers and the SIO2
/// exporter.
///
/// The geometry should use the right-handed Y-up coordinate system of the
/// source package. The exporter remaps it into the engine's space.
#[derive(Default)]
pub struct Scene {
    pub cameras: Vec<Camera>,
    pub lamps: Vec<Lamp>,
    pub materials: Vec<Material>,
    pub images: Vec<Image>,
    pub meshes: Vec<Mesh>,
}

impl Scene {
    /// Merges another scene into this one by appending its entities.
    pub fn merge(mut self, mut other: Scene) -> Scene {
        self.cameras.append(&mut other.cameras);
        self.lamps.append(&mut other.lamps);
        self.materials.append(&mut other.materials);
        self.images.append(&mut other.images);
        self.meshes.append(&mut other.meshes);
        self
    }
}

/// Represents a perspective camera.
#[derive(Debug, PartialEq)]
pub struct Camera {
    pub name: String,
    /// The position of the camera, relative to the origin.
    pub translation: Vec3A,
    /// The forward direction of the camera. Normalized by the exporter.
    pub direction: Vec3A,
    /// The horizontal field of view, in degrees.
    pub fov: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

/// Represents a light source.
#[derive(Debug, PartialEq)]
pub struct Lamp {
    pub name: String,
    pub kind: LampKind,
    pub translation: Vec3A,
    pub direction: Vec3A,
    /// Linear RGB color.
    pub color: Vec3,
    pub energy: f32,
    /// The falloff distance of the lamp.
    pub distance: f32,
    /// The cone angle of a spot lamp, in radians. Zero for other kinds.
    pub spot_fov: f32,
    /// The softness of a spot lamp's edge, in degrees.
    pub spot_blend: f32,
    /// Linear and quadratic attenuation factors.
    pub attenuation: [f32; 2],
}

/// The kind of a lamp, matching the engine's lamp type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LampKind {
    Point,
    Sun,
    Spot,
    Hemi,
    Area,
}

impl LampKind {
    /// Returns the numeric lamp type code used by the scene format.
    pub fn code(&self) -> u8 {
        match self {
            LampKind::Point => 0,
            LampKind::Sun => 1,
            LampKind::Spot => 2,
            LampKind::Hemi => 3,
            LampKind::Area => 4,
        }
    }
}

/// Represents a surface material with up to three texture channel bindings.
#[derive(Debug, Default, PartialEq)]
pub struct Material {
    pub name: String,
    /// The image bound to the diffuse texture channel, by image name.
    pub diffuse_map: Option<String>,
    /// The image bound to the ambient texture channel, by image name.
    pub ambient_map: Option<String>,
    /// A sound buffer bound through the incandescence channel. Only written
    /// when the file name refers to a sound buffer.
    pub sound_buffer: Option<String>,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub alpha: f32,
    pub shininess: f32,
}

/// A texture or sound file carried along with the scene and copied into the
/// exported layout verbatim.
pub struct Image {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Image {
    /// Whether the file is a sound buffer rather than a texture. Sound
    /// buffers are routed into the `sound/` category directory.
    pub fn is_sound_buffer(&self) -> bool {
        self.name.to_ascii_lowercase().contains(".ogg")
    }
}

/// Represents the geometry of a polygon mesh with optional per-vertex
/// attributes, skinning influences, and vertex animation.
///
/// `positions` is the authoritative vertex-index space: every other buffer
/// (colors, normals, resolved UV channels, group membership, animation
/// snapshots) is aligned against it by index.
#[derive(Default)]
pub struct Mesh {
    pub name: String,
    pub translation: Vec3A,
    /// Euler rotation angles, in radians.
    pub rotation: Vec3A,
    pub scale: Vec3A,
    /// The vertex positions, in source order. Not re-deduplicated.
    pub positions: Vec<Vec3A>,
    /// Per-vertex RGBA colors in 0..1, aligned with `positions`, or empty
    /// when the mesh carries no colors.
    pub colors: Vec<[f32; 4]>,
    /// Per-vertex normals aligned with `positions`, or empty.
    pub normals: Vec<Vec3A>,
    /// Raw UV pools, one per channel. Corners reference entries by index.
    pub uv_channels: Vec<Vec<Vec2>>,
    pub polygons: Vec<Polygon>,
    pub influences: Vec<Influence>,
    /// The names of the materials bound to this mesh.
    pub materials: Vec<String>,
    pub animation: Option<VertexAnimation>,
}

impl Mesh {
    /// Whether keyframe animation drives the mesh.
    pub fn has_keyframes(&self) -> bool {
        self.animation
            .as_ref()
            .map_or(false, |animation| !animation.key_times.is_empty())
    }
}

/// An ordered sequence of polygon corners. Polygons with more than three
/// corners are fan-triangulated by the exporter.
#[derive(Debug, Default, PartialEq)]
pub struct Polygon {
    pub corners: Vec<Corner>,
}

/// A polygon corner referencing a vertex position and, per UV channel, an
/// entry in the mesh's raw UV pool.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Corner {
    /// Index into the mesh `positions` array.
    pub position: usize,
    /// Per-channel indices into the mesh `uv_channels` pools.
    pub uv: [Option<usize>; MAX_TEXTURE_CHANNELS],
}

impl Corner {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            uv: [None; MAX_TEXTURE_CHANNELS],
        }
    }
}

/// A skinning influence: a bone or joint together with the set of vertices
/// it affects.
#[derive(Debug, PartialEq)]
pub struct Influence {
    pub name: String,
    /// Indices into the mesh `positions` array.
    pub vertices: Vec<usize>,
    pub weight: f32,
}

/// Time-sampled vertex animation.
///
/// `key_times` lists the key times of the driving animation curves in
/// discovery order. Duplicates are allowed; the exporter drops repeats by
/// exact value while keeping arrival order. `samples` holds full
/// vertex-position snapshots looked up by exact time value; a missing sample
/// at a requested time skips that frame.
#[derive(Debug, Default, PartialEq)]
pub struct VertexAnimation {
    pub key_times: Vec<f64>,
    pub samples: Vec<(f64, Vec<Vec3A>)>,
}

impl VertexAnimation {
    /// Returns the vertex-position snapshot at the given time, if one was
    /// sampled there.
    pub fn sample(&self, time: f64) -> Option<&[Vec3A]> {
        self.samples
            .iter()
            .find(|(sample_time, _)| *sample_time == time)
            .map(|(_, points)| points.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sample_by_exact_time() {
        let animation = VertexAnimation {
            key_times: vec![0., 4.],
            samples: vec![(0., vec![Vec3A::ZERO]), (4., vec![Vec3A::new(1., 0., 0.)])],
        };

        assert_eq!(Some(&[Vec3A::new(1., 0., 0.)][..]), animation.sample(4.));
        assert_eq!(None, animation.sample(2.));
    }

    #[test]
    fn sound_buffer_detection() {
        let sound = Image {
            name: String::from("steps.OGG"),
            bytes: Vec::new(),
        };
        let texture = Image {
            name: String::from("skin.png"),
            bytes: Vec::new(),
        };

        assert!(sound.is_sound_buffer());
        assert!(!texture.is_sound_buffer());
    }
}
