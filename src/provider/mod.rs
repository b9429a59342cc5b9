//! Provider module - Generation and asset-hosting collaborators

pub mod cloudinary;
pub mod openai;
pub mod traits;

pub use traits::{AssetHost, HostedAsset, ImageGenerator};
