//! deck-assets-core: Asset contract and change notifier for deck-assets.
//!
//! This crate contains the `Asset` trait every stored value implements, the
//! concurrent `Notifier` stores use to publish changes, the error type and
//! shared constants.

mod asset;
pub mod constants;
mod error;
mod notifier;

pub use asset::Asset;
pub use constants::{COLOR_SAVE_KEY, ICON_SAVE_KEY, NOTIFIER_WORKER_THREADS};
pub use error::{AssetError, Result};
pub use notifier::{
    build_runtime, AsyncSubscriber, Delivery, Notifier, NotifyReport, NotifyRuntime, Subscriber,
    SubscriberId,
};

// Re-export types used in trait signatures for convenience
pub use deck_assets_types::{AssetEvent, Color, Icon, ManagerEvent};

/// Event type emitted by a store holding assets of type `A`
pub type StoreEvent<A> = AssetEvent<A, <A as Asset>::Values>;
