use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// A file produced by an exporter or handed to an importer. The path is
/// relative: for produced files it is the record path inside the scene
/// layout (e.g. `object/Body`).
pub struct Asset {
    pub bytes: Vec<u8>,
    path: PathBuf,
}

impl Asset {
    pub fn new(bytes: Vec<u8>, path: &str) -> Self {
        Self {
            bytes,
            path: path.into(),
        }
    }

    /// Reads an asset from disk.
    pub fn from_path(path: &str) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read the asset \"{}\"", path))?;
        Ok(Self {
            bytes,
            path: path.into(),
        })
    }

    /// Get a reference to the asset's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file name of the asset without its extension.
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .unwrap_or_default()
            .to_str()
            .unwrap_or_default()
    }

    /// The extension of the asset, without the period.
    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .unwrap_or_default()
            .to_str()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn name_and_extension() {
        let asset = Asset::new(Vec::new(), "models/goblin.glb");

        assert_eq!("goblin", asset.name());
        assert_eq!("glb", asset.extension());
    }

    #[test]
    fn record_path_without_extension() {
        let asset = Asset::new(Vec::new(), "object/Body");

        assert_eq!("Body", asset.name());
        assert_eq!("", asset.extension());
    }
}
