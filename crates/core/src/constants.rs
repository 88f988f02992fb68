//! Shared constants for asset stores

/// Document key the color store reads and writes its overrides under
pub const COLOR_SAVE_KEY: &str = "colors";

/// Document key the icon store reads and writes its overrides under
pub const ICON_SAVE_KEY: &str = "icons";

/// Worker threads for the notification runtime.
/// Plain subscribers run on the blocking pool, so this only bounds how many
/// async subscribers make progress at once.
pub const NOTIFIER_WORKER_THREADS: usize = 2;
