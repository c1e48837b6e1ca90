// src/services/mod.rs
pub mod image_inspector;
pub mod session_store;
pub mod transform_client;

pub use image_inspector::ImageInspector;
pub use session_store::SessionStore;
pub use transform_client::{GeminiTransformClient, ImageTransformer};
