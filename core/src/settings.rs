//! Per-skin persisted settings
//!
//! Each skin reads its record once at open and writes individual fields back
//! on change. Writes are gated by a [`SettingFlags`] mask so unrelated
//! settings changes never cause redundant writes.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Bitmask selecting which fields of a [`SkinSettings`] record to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingFlags(pub u32);

impl SettingFlags {
    pub const POSITION: SettingFlags = SettingFlags(1 << 0);
    pub const ALPHA: SettingFlags = SettingFlags(1 << 1);
    pub const FADE_DURATION: SettingFlags = SettingFlags(1 << 2);
    pub const CLICK_THROUGH: SettingFlags = SettingFlags(1 << 3);
    pub const DRAGGABLE: SettingFlags = SettingFlags(1 << 4);
    pub const HIDE_ON_MOUSE_OVER: SettingFlags = SettingFlags(1 << 5);
    pub const SAVE_POSITION: SettingFlags = SettingFlags(1 << 6);
    pub const SNAP_EDGES: SettingFlags = SettingFlags(1 << 7);
    pub const KEEP_ON_SCREEN: SettingFlags = SettingFlags(1 << 8);
    pub const AUTO_SELECT_SCREEN: SettingFlags = SettingFlags(1 << 9);
    pub const ALWAYS_ON_TOP: SettingFlags = SettingFlags(1 << 10);
    pub const ANCHOR: SettingFlags = SettingFlags(1 << 11);
    pub const ALL: SettingFlags = SettingFlags(u32::MAX);

    pub fn contains(&self, other: SettingFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SettingFlags {
    type Output = SettingFlags;

    fn bitor(self, rhs: SettingFlags) -> SettingFlags {
        SettingFlags(self.0 | rhs.0)
    }
}

/// Window z-order policy, persisted as part of the settings record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZPosition {
    OnDesktop,
    OnBottom,
    #[default]
    Normal,
    OnTop,
    OnTopMost,
}

impl ZPosition {
    pub fn from_int(v: i32) -> ZPosition {
        match v {
            -2 => ZPosition::OnDesktop,
            -1 => ZPosition::OnBottom,
            1 => ZPosition::OnTop,
            2 => ZPosition::OnTopMost,
            _ => ZPosition::Normal,
        }
    }
}

/// Hover hide mode: what happens to the window when the pointer enters it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HideMode {
    #[default]
    None,
    /// Window hides entirely while hovered.
    Hide,
    /// Window fades from its configured alpha up to opaque while hovered.
    FadeIn,
    /// Window fades from opaque down to its configured alpha while hovered.
    FadeOut,
}

impl HideMode {
    pub fn from_int(v: i32) -> HideMode {
        match v {
            1 => HideMode::Hide,
            2 => HideMode::FadeIn,
            3 => HideMode::FadeOut,
            _ => HideMode::None,
        }
    }
}

/// One skin's persisted settings, keyed by its folder path in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinSettings {
    pub window_x: String,
    pub window_y: String,
    pub anchor_x: String,
    pub anchor_y: String,
    pub alpha: u8,
    pub fade_duration: u32,
    pub z_position: ZPosition,
    pub hide_mode: HideMode,
    pub click_through: bool,
    pub draggable: bool,
    pub snap_edges: bool,
    pub keep_on_screen: bool,
    pub auto_select_screen: bool,
    pub save_position: bool,
    pub start_hidden: bool,
}

impl Default for SkinSettings {
    fn default() -> Self {
        Self {
            window_x: "0".to_owned(),
            window_y: "0".to_owned(),
            anchor_x: "0".to_owned(),
            anchor_y: "0".to_owned(),
            alpha: 255,
            fade_duration: 250,
            z_position: ZPosition::Normal,
            hide_mode: HideMode::None,
            click_through: false,
            draggable: true,
            snap_edges: true,
            keep_on_screen: true,
            auto_select_screen: false,
            save_position: true,
            start_hidden: false,
        }
    }
}

impl SkinSettings {
    /// Copy the fields selected by `mask` from `src` into `self`.
    fn merge_masked(&mut self, src: &SkinSettings, mask: SettingFlags) {
        if mask.contains(SettingFlags::POSITION) {
            self.window_x = src.window_x.clone();
            self.window_y = src.window_y.clone();
        }
        if mask.contains(SettingFlags::ANCHOR) {
            self.anchor_x = src.anchor_x.clone();
            self.anchor_y = src.anchor_y.clone();
        }
        if mask.contains(SettingFlags::ALPHA) {
            self.alpha = src.alpha;
        }
        if mask.contains(SettingFlags::FADE_DURATION) {
            self.fade_duration = src.fade_duration;
        }
        if mask.contains(SettingFlags::CLICK_THROUGH) {
            self.click_through = src.click_through;
        }
        if mask.contains(SettingFlags::DRAGGABLE) {
            self.draggable = src.draggable;
        }
        if mask.contains(SettingFlags::HIDE_ON_MOUSE_OVER) {
            self.hide_mode = src.hide_mode;
        }
        if mask.contains(SettingFlags::SAVE_POSITION) {
            self.save_position = src.save_position;
        }
        if mask.contains(SettingFlags::SNAP_EDGES) {
            self.snap_edges = src.snap_edges;
        }
        if mask.contains(SettingFlags::KEEP_ON_SCREEN) {
            self.keep_on_screen = src.keep_on_screen;
        }
        if mask.contains(SettingFlags::AUTO_SELECT_SCREEN) {
            self.auto_select_screen = src.auto_select_screen;
        }
        if mask.contains(SettingFlags::ALWAYS_ON_TOP) {
            self.z_position = src.z_position;
        }
    }
}

/// Storage for per-skin settings records.
pub trait SettingsStore {
    /// Load the record for `skin_key`, or the defaults when absent.
    fn load(&self, skin_key: &str) -> SkinSettings;

    /// Persist the fields of `settings` selected by `mask` into the stored
    /// record for `skin_key`. Unselected fields keep their stored values.
    fn save(&mut self, skin_key: &str, settings: &SkinSettings, mask: SettingFlags);
}

/// In-memory store; records every save call for inspection.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    records: HashMap<String, SkinSettings>,
    saves: Vec<(String, SettingFlags)>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, skin_key: &str, settings: SkinSettings) -> Self {
        self.records.insert(skin_key.to_owned(), settings);
        self
    }

    /// Save calls made so far, in order.
    pub fn saves(&self) -> &[(String, SettingFlags)] {
        &self.saves
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, skin_key: &str) -> SkinSettings {
        self.records.get(skin_key).cloned().unwrap_or_default()
    }

    fn save(&mut self, skin_key: &str, settings: &SkinSettings, mask: SettingFlags) {
        self.records
            .entry(skin_key.to_owned())
            .or_default()
            .merge_masked(settings, mask);
        self.saves.push((skin_key.to_owned(), mask));
    }
}

/// All skins' settings as one TOML document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SettingsFile {
    skins: std::collections::HashMap<String, SkinSettings>,
}

/// File-backed store (TOML via confy).
pub struct FileSettingsStore {
    path: PathBuf,
    file: SettingsFile,
}

impl FileSettingsStore {
    pub fn open(path: &Path) -> Result<Self, SettingsError> {
        let file = confy::load_path(path)?;
        Ok(Self {
            path: path.to_owned(),
            file,
        })
    }

    fn flush(&self) -> Result<(), SettingsError> {
        confy::store_path(&self.path, &self.file).map_err(SettingsError::Save)
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self, skin_key: &str) -> SkinSettings {
        self.file.skins.get(skin_key).cloned().unwrap_or_default()
    }

    fn save(&mut self, skin_key: &str, settings: &SkinSettings, mask: SettingFlags) {
        self.file
            .skins
            .entry(skin_key.to_owned())
            .or_default()
            .merge_masked(settings, mask);
        if let Err(err) = self.flush() {
            tracing::error!(skin = skin_key, error = %err, "failed to persist skin settings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_save_leaves_other_fields() {
        let mut store = MemorySettingsStore::new();
        let mut s = SkinSettings::default();
        s.alpha = 100;
        s.window_x = "500".to_owned();
        store.save("A\\B", &s, SettingFlags::ALPHA);

        let loaded = store.load("A\\B");
        assert_eq!(loaded.alpha, 100);
        // Position was not selected by the mask.
        assert_eq!(loaded.window_x, "0");
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut store = FileSettingsStore::open(&path).unwrap();
        let mut s = SkinSettings::default();
        s.window_x = "50%".to_owned();
        s.window_y = "10".to_owned();
        store.save("Clock", &s, SettingFlags::POSITION);

        let reopened = FileSettingsStore::open(&path).unwrap();
        let loaded = reopened.load("Clock");
        assert_eq!(loaded.window_x, "50%");
        assert_eq!(loaded.window_y, "10");
        assert_eq!(loaded.alpha, 255);
    }
}
