use std::{collections::HashMap, fs};

use anyhow::Result;

use crate::{
    asset::Asset,
    formats::{GltfImporter, Sio2Exporter},
    formats::sio2::{self, ExportOptions},
    scene::Scene,
};

/// Defines a type that can import asset files into a scene.
pub trait Importer {
    /// Imports an asset file into a scene.
    fn import(&self, asset: &Asset, scene: &mut Scene) -> Result<()>;
    /// Returns the file extensions supported by the importer. These extensions are used to
    /// select the appropriate importer given an asset file.
    ///
    /// The extension should not include the period (e.g "glb", not ".glb").
    fn extensions(&self) -> &[&str];
}

/// Defines a type that can export a scene into asset files.
pub trait Exporter {
    /// Exports a scene into one or more asset files.
    fn export(&self, scene: &Scene) -> Result<Vec<Asset>>;
}

/// Imports the given files into a single merged scene and exports it as a
/// scene layout under the destination directory.
pub fn convert(files: &[String], options: ExportOptions) -> Result<()> {
    let importers = importers();
    let importers: HashMap<_, _> = importers
        .iter()
        .flat_map(|importer| importer.extensions().iter().map(move |ext| (ext, importer)))
        .collect();

    let scenes = files
        .iter()
        // Read asset bytes.
        .map(|file| Asset::from_path(file))
        // Skip invalid assets.
        .filter_map(|result| match result {
            Ok(asset) => Some(asset),
            Err(err) => {
                eprintln!("{}", err);
                None
            }
        })
        // Import supported formats.
        .filter_map(
            |asset| match importers.get(&asset.extension().to_lowercase().as_str()) {
                Some(importer) => {
                    let mut scene = Scene::default();

                    eprint!("Importing \"{}.{}\"... ", asset.name(), asset.extension());
                    match importer.import(&asset, &mut scene) {
                        Ok(_) => {
                            eprintln!("Success!");
                            Some(scene)
                        }
                        Err(err) => {
                            eprintln!("Failure: {}", err);
                            None
                        }
                    }
                }
                None => {
                    eprintln!(
                        "Skipped \"{}.{}\": unsupported extension",
                        asset.name(),
                        asset.extension()
                    );
                    None
                }
            },
        );

    // Merge imported scenes.
    let scene = match scenes.into_iter().reduce(|a, b| a.merge(b)) {
        Some(scene) => scene,
        None => {
            eprintln!("No assets were exported");
            return Ok(());
        }
    };

    // The layout must exist in full before any record is written; a failure
    // here aborts the whole export.
    let root = sio2::create_scene_layout(&options)?;

    let exporter = Sio2Exporter::new(options);
    let assets = exporter.export(&scene)?;
    for asset in assets {
        let path = root.join(asset.path());
        match fs::write(&path, &asset.bytes) {
            Ok(_) => {
                eprintln!(
                    "Exported \"{}\" successfully!",
                    asset.path().to_str().unwrap_or("<INVALID NAME>"),
                );
            }
            Err(err) => {
                eprintln!(
                    "Failed to export \"{}\": {}",
                    asset.path().to_str().unwrap_or("<INVALID NAME>"),
                    err
                );
            }
        }
    }

    Ok(())
}

// Returns all importers available.
fn importers() -> Vec<Box<dyn Importer>> {
    vec![Box::new(GltfImporter::default())]
}
