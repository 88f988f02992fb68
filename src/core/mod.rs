//! Asset stores and the manager that ties them to disk

mod asset_manager;
mod render_cache;
mod store;

pub use asset_manager::AssetManager;
pub use render_cache::{FileBytesRenderer, IconRenderer, RenderCache};
pub use store::AssetStore;
