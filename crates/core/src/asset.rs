//! The asset contract and its color and icon implementations

use crate::error::{AssetError, Result};
use deck_assets_types::{Color, Icon};
use serde_json::Value;
use std::fmt::Debug;
use std::path::PathBuf;

/// A named, mutable value a store can hold.
///
/// Stores only ever call these four operations, so any type implementing
/// them can be managed with overrides, persistence and notifications.
pub trait Asset: Clone + Debug + Send + Sync + 'static {
    /// The value tuple `change` accepts and `values` returns
    type Values: Clone + Debug + Send + Sync + 'static;

    /// Mutate in place
    fn change(&mut self, values: Self::Values);

    /// Current values
    fn values(&self) -> Self::Values;

    /// Serialize to the form stored in the override document
    fn to_json(&self) -> Value;

    /// Construct from the form produced by `to_json`
    fn from_json(data: &Value) -> Result<Self>;
}

impl Asset for Color {
    type Values = [u8; 4];

    fn change(&mut self, values: [u8; 4]) {
        *self = Color::from(values);
    }

    fn values(&self) -> [u8; 4] {
        self.to_array()
    }

    fn to_json(&self) -> Value {
        Value::from(self.to_array().to_vec())
    }

    /// Accepts `[r, g, b, a]` with integer channels, or floats that round
    /// into 0..=255.
    fn from_json(data: &Value) -> Result<Self> {
        let items = data
            .as_array()
            .ok_or_else(|| AssetError::invalid("color", format!("expected array, got {}", data)))?;
        if items.len() != 4 {
            return Err(AssetError::invalid(
                "color",
                format!("expected 4 channels, got {}", items.len()),
            ));
        }

        let mut channels = [0u8; 4];
        for (slot, item) in channels.iter_mut().zip(items) {
            let raw = item
                .as_f64()
                .ok_or_else(|| AssetError::invalid("color", format!("channel {} is not a number", item)))?;
            let rounded = raw.round();
            if !(0.0..=255.0).contains(&rounded) {
                return Err(AssetError::invalid(
                    "color",
                    format!("channel {} out of range 0-255", raw),
                ));
            }
            *slot = rounded as u8;
        }
        Ok(Color::from(channels))
    }
}

impl Asset for Icon {
    type Values = PathBuf;

    fn change(&mut self, values: PathBuf) {
        self.set_path(values);
    }

    fn values(&self) -> PathBuf {
        self.path().to_path_buf()
    }

    fn to_json(&self) -> Value {
        Value::String(self.path().to_string_lossy().into_owned())
    }

    fn from_json(data: &Value) -> Result<Self> {
        match data.as_str() {
            Some(path) if !path.is_empty() => Ok(Icon::new(path)),
            Some(_) => Err(AssetError::invalid("icon", "empty path")),
            None => Err(AssetError::invalid(
                "icon",
                format!("expected path string, got {}", data),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_color_change_in_place() {
        let mut color = Color::new(0, 0, 0, 255);
        color.change([10, 20, 30, 40]);
        assert_eq!(color.values(), [10, 20, 30, 40]);
    }

    #[test]
    fn test_color_json_shape() {
        let color = Color::new(255, 0, 128, 255);
        assert_eq!(color.to_json(), json!([255, 0, 128, 255]));
        assert_eq!(Color::from_json(&json!([255, 0, 128, 255])).unwrap(), color);
    }

    #[test]
    fn test_color_from_json_accepts_float_channels() {
        let color = Color::from_json(&json!([254.6, 0.0, 1, 255])).unwrap();
        assert_eq!(color, Color::new(255, 0, 1, 255));
    }

    #[test]
    fn test_color_from_json_rejects_bad_input() {
        assert!(Color::from_json(&json!([1, 2, 3])).is_err());
        assert!(Color::from_json(&json!([1, 2, 3, 300])).is_err());
        assert!(Color::from_json(&json!([1, 2, "x", 4])).is_err());
        assert!(Color::from_json(&json!("red")).is_err());
    }

    #[test]
    fn test_icon_json_round_trip() {
        let icon = Icon::new("/tmp/play.png");
        let json = icon.to_json();
        assert_eq!(json, json!("/tmp/play.png"));
        assert_eq!(Icon::from_json(&json).unwrap(), icon);
    }

    #[test]
    fn test_icon_from_json_rejects_non_string() {
        assert!(Icon::from_json(&json!(42)).is_err());
        assert!(Icon::from_json(&json!("")).is_err());
    }

    #[test]
    fn test_icon_change_replaces_path() {
        let mut icon = Icon::new("/a.png");
        icon.change(PathBuf::from("/b.png"));
        assert_eq!(icon.values(), PathBuf::from("/b.png"));
    }
}
