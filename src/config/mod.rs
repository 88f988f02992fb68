//! Configuration management

mod document;
mod settings;

pub use document::OverrideDocument;
pub use settings::Settings;
