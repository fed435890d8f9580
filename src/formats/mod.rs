pub use self::{gltf::GltfImporter, sio2::Sio2Exporter};

pub mod gltf;
pub mod sio2;
