pub use importer::GltfImporter;

mod importer;
