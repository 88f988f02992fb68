//! deck-assets: named colors and icons with user overrides
//!
//! This library provides:
//! - Two-layer asset stores (base and override) with change notifications
//! - An asset manager persisting overrides to a shared JSON document
//! - A rendered icon cache
//! - Settings management

pub mod config;
pub mod core;

// Re-export commonly used types
pub use config::{OverrideDocument, Settings};
pub use core::{AssetManager, AssetStore, FileBytesRenderer, IconRenderer, RenderCache};
pub use deck_assets_core::{
    Asset, AssetError, AssetEvent, AsyncSubscriber, Color, Delivery, Icon, ManagerEvent,
    Notifier, NotifyReport, StoreEvent, Subscriber, SubscriberId,
};
