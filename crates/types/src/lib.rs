//! deck-assets-types: Shared data types for deck-assets.
//!
//! This crate contains pure data types (colors, icons, rendered images and
//! change events) shared by the store and the plugin-facing manager. They
//! carry no runtime or toolkit dependencies.

pub mod color;
pub mod event;
pub mod icon;

// Re-export commonly used types at the crate root for convenience
pub use color::Color;
pub use event::{AssetEvent, ManagerEvent};
pub use icon::{Icon, RenderedImage};
