//! Override-aware asset store
//!
//! Holds a base layer of programmatically registered assets and an
//! override layer of user customizations for a single asset kind. Lookups
//! prefer the override. Every mutation is published through the store's
//! own notifier after it has been applied.

use deck_assets_core::{
    Asset, AsyncSubscriber, ManagerEvent, Notifier, NotifyRuntime, StoreEvent, Subscriber,
    SubscriberId,
};
use log::{debug, trace, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Base assets plus user overrides for one asset kind.
///
/// Adding over an existing key, or removing/changing a missing one, is a
/// silent no-op. Mutators return `true` only when the store changed.
pub struct AssetStore<A: Asset> {
    assets: HashMap<String, A>,
    overrides: HashMap<String, A>,
    /// Key of this store's section in the override document
    save_key: String,
    notifier: Notifier<StoreEvent<A>>,
}

impl<A: Asset> AssetStore<A> {
    /// Create an empty store whose notifications run on `runtime`
    pub fn new(save_key: impl Into<String>, runtime: Arc<NotifyRuntime>) -> Self {
        Self {
            assets: HashMap::new(),
            overrides: HashMap::new(),
            save_key: save_key.into(),
            notifier: Notifier::new(runtime),
        }
    }

    pub fn save_key(&self) -> &str {
        &self.save_key
    }

    /// Bound how long a single notification may wait for its subscribers
    pub fn set_notify_timeout(&mut self, timeout: Option<Duration>) {
        self.notifier.set_timeout(timeout);
    }

    // Assets

    pub fn add_asset(&mut self, name: &str, asset: A, overwrite: bool) -> bool {
        if self.assets.contains_key(name) && !overwrite {
            debug!("{}: asset '{}' already registered", self.save_key, name);
            return false;
        }

        self.assets.insert(name.to_string(), asset.clone());
        self.notifier
            .notify(StoreEvent::<A>::added(ManagerEvent::Add, name, asset));
        true
    }

    pub fn remove_asset(&mut self, name: &str) -> bool {
        if self.assets.remove(name).is_none() {
            return false;
        }

        self.notifier
            .notify(StoreEvent::<A>::removed(ManagerEvent::Remove, name));
        true
    }

    /// Mutate the base asset in place. Overrides are never touched here.
    pub fn change_asset(&mut self, name: &str, values: A::Values) -> bool {
        let Some(asset) = self.assets.get_mut(name) else {
            debug!("{}: cannot change unknown asset '{}'", self.save_key, name);
            return false;
        };

        asset.change(values.clone());
        let snapshot = asset.clone();
        self.notifier.notify(StoreEvent::<A>::changed(
            ManagerEvent::Change,
            name,
            snapshot,
            values,
        ));
        true
    }

    // Overrides

    /// Layer a user override over an asset.
    ///
    /// Requires a base asset of the same name unless `skip_base_check` is
    /// set, and an absent override unless `overwrite` is set.
    pub fn add_override(
        &mut self,
        name: &str,
        asset: A,
        skip_base_check: bool,
        overwrite: bool,
    ) -> bool {
        if !skip_base_check && !self.assets.contains_key(name) {
            debug!(
                "{}: override '{}' rejected, no base asset",
                self.save_key, name
            );
            return false;
        }
        if self.overrides.contains_key(name) && !overwrite {
            debug!("{}: override '{}' already present", self.save_key, name);
            return false;
        }

        self.overrides.insert(name.to_string(), asset.clone());
        self.notifier
            .notify(StoreEvent::<A>::added(ManagerEvent::OverrideAdd, name, asset));
        true
    }

    pub fn remove_override(&mut self, name: &str) -> bool {
        if self.overrides.remove(name).is_none() {
            return false;
        }

        self.notifier
            .notify(StoreEvent::<A>::removed(ManagerEvent::OverrideRemove, name));
        true
    }

    pub fn change_override(&mut self, name: &str, values: A::Values) -> bool {
        let Some(asset) = self.overrides.get_mut(name) else {
            return false;
        };

        asset.change(values.clone());
        let snapshot = asset.clone();
        self.notifier.notify(StoreEvent::<A>::changed(
            ManagerEvent::OverrideChange,
            name,
            snapshot,
            values,
        ));
        true
    }

    // Getters

    /// Returns the override before the asset if one exists.
    /// With `skip_override` the base asset is always returned.
    pub fn get_asset(&self, name: &str, skip_override: bool) -> Option<&A> {
        if skip_override {
            return self.assets.get(name);
        }
        self.overrides.get(name).or_else(|| self.assets.get(name))
    }

    pub fn get_asset_values(&self, name: &str, skip_override: bool) -> Option<A::Values> {
        self.get_asset(name, skip_override).map(Asset::values)
    }

    pub fn get_assets(&self) -> &HashMap<String, A> {
        &self.assets
    }

    pub fn get_overrides(&self) -> &HashMap<String, A> {
        &self.overrides
    }

    /// Base assets with every override laid on top
    pub fn get_assets_merged(&self) -> HashMap<&str, &A> {
        let mut merged: HashMap<&str, &A> = self
            .assets
            .iter()
            .map(|(name, asset)| (name.as_str(), asset))
            .collect();
        for (name, asset) in &self.overrides {
            merged.insert(name.as_str(), asset);
        }
        merged
    }

    pub fn has_override(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }

    /// Overrides with no matching base asset, sorted by name
    pub fn stale_overrides(&self) -> Vec<&str> {
        let mut stale: Vec<&str> = self
            .overrides
            .keys()
            .filter(|name| !self.assets.contains_key(*name))
            .map(String::as_str)
            .collect();
        stale.sort_unstable();
        stale
    }

    // Listeners

    pub fn add_listener(&mut self, listener: Arc<dyn Subscriber<StoreEvent<A>>>) -> SubscriberId {
        self.notifier.subscribe(listener)
    }

    pub fn add_async_listener(
        &mut self,
        listener: Arc<dyn AsyncSubscriber<StoreEvent<A>>>,
    ) -> SubscriberId {
        self.notifier.subscribe_async(listener)
    }

    pub fn remove_listener(&mut self, id: &str) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.len()
    }

    // Save/Load

    /// Base layer as `{name: asset.to_json()}`
    pub fn export_json(&self) -> Value {
        layer_json(&self.assets)
    }

    /// Override layer as `{name: asset.to_json()}`, the form written under
    /// the save key
    pub fn override_json(&self) -> Value {
        layer_json(&self.overrides)
    }

    /// Admit every entry under `document[save_key]` as an override.
    ///
    /// Base assets are usually registered after overrides are loaded, so
    /// the base-presence check is skipped. Entries that fail to parse are
    /// logged and skipped. Returns the number of overrides added.
    pub fn load_json(&mut self, document: &Value) -> usize {
        let Some(entries) = self.section(document) else {
            return 0;
        };

        let mut loaded = 0;
        for (name, value) in entries {
            match A::from_json(value) {
                Ok(asset) => {
                    if self.add_override(name, asset, true, false) {
                        loaded += 1;
                    }
                }
                Err(e) => warn!("{}: skipping override '{}': {}", self.save_key, name, e),
            }
        }
        debug!("{}: loaded {} overrides", self.save_key, loaded);
        loaded
    }

    /// Register every entry under `document[save_key]` as a base asset.
    /// Existing base assets are kept. Returns the number of assets added.
    pub fn load_assets_json(&mut self, document: &Value) -> usize {
        let Some(entries) = self.section(document) else {
            return 0;
        };

        let mut loaded = 0;
        for (name, value) in entries {
            match A::from_json(value) {
                Ok(asset) => {
                    if self.add_asset(name, asset, false) {
                        loaded += 1;
                    }
                }
                Err(e) => warn!("{}: skipping asset '{}': {}", self.save_key, name, e),
            }
        }
        loaded
    }

    fn section<'a>(&self, document: &'a Value) -> Option<&'a Map<String, Value>> {
        let section = document.get(&self.save_key)?;
        if section.is_null() {
            return None;
        }

        let Some(entries) = section.as_object() else {
            warn!(
                "{}: expected an object in the document, found {}",
                self.save_key, section
            );
            return None;
        };
        if entries.is_empty() {
            trace!("{}: document section is empty", self.save_key);
            return None;
        }
        Some(entries)
    }
}

fn layer_json<A: Asset>(layer: &HashMap<String, A>) -> Value {
    let map: Map<String, Value> = layer
        .iter()
        .map(|(name, asset)| (name.clone(), asset.to_json()))
        .collect();
    Value::Object(map)
}
