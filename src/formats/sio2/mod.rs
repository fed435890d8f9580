use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

pub use self::{
    exporter::Sio2Exporter,
    geometry::Membership,
    record::{normalize, normalize_to},
};

pub mod exporter;
pub mod geometry;
pub mod record;
pub mod space;

/// The category directories of a scene layout. Every exported record lands
/// in one of them, and consuming engines expect all of them to exist.
pub const CATEGORY_DIRS: [&str; 8] = [
    "camera", "lamp", "image", "ipo", "material", "object", "sound", "script",
];

/// The settings of one export session. Built once per full-scene export and
/// passed into every stage; nothing about a session outlives it.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// The directory the scene layout is created under.
    pub destination: PathBuf,
    /// The name of the scene directory.
    pub scene_name: String,
    /// The sampling step for the animation fallback, in frames. Zero
    /// disables the fallback.
    pub frame_rate: u32,
    /// Blend-shape export mode: meshes without keyframe animation are
    /// excluded from export entirely.
    pub blend_shapes: bool,
    /// Reverse the winding order of every triangle.
    pub convert_to_backface_culling: bool,
    /// The vertex-group membership policy.
    pub membership: Membership,
    /// The playback range sampled by the animation fallback.
    pub playback: (f64, f64),
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            scene_name: String::from("TempScene"),
            frame_rate: 0,
            blend_shapes: false,
            convert_to_backface_culling: false,
            membership: Membership::default(),
            playback: (0., 0.),
        }
    }
}

impl ExportOptions {
    /// The root directory of the scene layout.
    pub fn scene_dir(&self) -> PathBuf {
        self.destination.join(&self.scene_name)
    }
}

/// Creates the scene directory and its category subdirectories. Any failure
/// aborts the export; nothing created so far is cleaned up.
pub fn create_scene_layout(options: &ExportOptions) -> Result<PathBuf> {
    let root = options.scene_dir();
    fs::create_dir(&root)
        .with_context(|| format!("Failed to create the scene directory {:?}", root))?;

    for dir in CATEGORY_DIRS {
        let path = root.join(dir);
        fs::create_dir(&path)
            .with_context(|| format!("Failed to create the category directory {:?}", path))?;
    }

    Ok(root)
}

/// Sanitizes an entity name for use as a record path. The source package
/// allows namespace separators that the layout cannot carry.
pub fn sanitize_name(name: &str) -> String {
    name.replace(':', "_")
}

/// Whether a bound file name refers to a sound buffer.
pub fn is_sound_buffer(name: &str) -> bool {
    name.to_ascii_lowercase().contains(".ogg")
}
