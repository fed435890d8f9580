pub mod asset;
pub mod conversion;
pub mod formats;
pub mod scene;
