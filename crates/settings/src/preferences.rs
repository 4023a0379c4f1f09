use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use docforge_tree::write_atomic;

const PREFERENCES_VERSION: u32 = 1;
const DEFAULT_DOC_TYPE: &str = "markdown";

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed preferences {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PreferencesError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub editor: EditorPreferences,
    #[serde(default)]
    pub tree: TreePreferences,
}

fn current_version() -> u32 {
    PREFERENCES_VERSION
}

fn enabled() -> bool {
    true
}

fn default_doc_type() -> String {
    DEFAULT_DOC_TYPE.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            editor: EditorPreferences::default(),
            tree: TreePreferences::default(),
        }
    }
}

impl Preferences {
    /// Repairs values a hand-edited or older file may carry.
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        } else if self.version > PREFERENCES_VERSION {
            warn!(
                "preferences version {} is newer than supported {PREFERENCES_VERSION}",
                self.version
            );
            self.version = PREFERENCES_VERSION;
        }
        let doc_type = self.editor.default_doc_type.trim();
        if doc_type.is_empty() {
            self.editor.default_doc_type = default_doc_type();
        } else if doc_type.len() != self.editor.default_doc_type.len() {
            self.editor.default_doc_type = doc_type.to_string();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPreferences {
    /// Flush pending edits when a document is closed or switched away from.
    #[serde(default = "enabled")]
    pub autosave_on_close: bool,
    #[serde(default = "enabled")]
    pub confirm_delete: bool,
    #[serde(default = "default_doc_type")]
    pub default_doc_type: String,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            autosave_on_close: true,
            confirm_delete: true,
            default_doc_type: default_doc_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePreferences {
    /// Show every folder open while a search filter is active.
    #[serde(default = "enabled")]
    pub expand_all_when_filtering: bool,
}

impl Default for TreePreferences {
    fn default() -> Self {
        Self {
            expand_all_when_filtering: true,
        }
    }
}

/// JSON-backed preferences file.
#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    /// Loads the file, falling back to defaults when it does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            read_preferences(&path)?
        } else {
            debug!("no preferences at {}, using defaults", path.display());
            Preferences::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    /// Applies `op`, sanitizes and saves.
    pub fn update<F>(&mut self, op: F) -> Result<(), PreferencesError>
    where
        F: FnOnce(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        let payload = to_json(&self.data, &self.path)?;
        write_atomic(&self.path, payload.as_bytes())
            .map_err(PreferencesError::io("write", &self.path))?;
        info!("saved preferences to {}", self.path.display());
        Ok(())
    }

    pub fn export_to(&self, target: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let target = target.as_ref();
        let payload = to_json(&self.data, target)?;
        write_atomic(target, payload.as_bytes()).map_err(PreferencesError::io("export", target))
    }

    /// Replaces the current preferences with `source`, keeping a `.bak` copy of the old file.
    pub fn import_from(&mut self, source: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let data = read_preferences(source.as_ref())?;
        if self.path.exists() {
            let backup = self.path.with_extension("bak");
            fs::copy(&self.path, &backup).map_err(PreferencesError::io("back up", &backup))?;
        }
        self.data = data;
        self.save()
    }
}

fn read_preferences(path: &Path) -> Result<Preferences, PreferencesError> {
    let raw = fs::read_to_string(path).map_err(PreferencesError::io("read", path))?;
    let mut data: Preferences = serde_json::from_str(&raw).map_err(PreferencesError::json(path))?;
    data.sanitize();
    Ok(data)
}

fn to_json(data: &Preferences, path: &Path) -> Result<String, PreferencesError> {
    serde_json::to_string_pretty(data).map_err(PreferencesError::json(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_repairs_version_and_doc_type() {
        let mut prefs = Preferences {
            version: 0,
            editor: EditorPreferences {
                default_doc_type: "   ".into(),
                ..EditorPreferences::default()
            },
            ..Preferences::default()
        };
        prefs.sanitize();
        assert_eq!(prefs.version, PREFERENCES_VERSION);
        assert_eq!(prefs.editor.default_doc_type, "markdown");

        prefs.version = 99;
        prefs.editor.default_doc_type = " python ".into();
        prefs.sanitize();
        assert_eq!(prefs.version, PREFERENCES_VERSION);
        assert_eq!(prefs.editor.default_doc_type, "python");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"editor":{"confirm_delete":false}}"#).unwrap();
        assert_eq!(prefs.version, PREFERENCES_VERSION);
        assert!(prefs.editor.autosave_on_close);
        assert!(!prefs.editor.confirm_delete);
        assert!(prefs.tree.expand_all_when_filtering);
    }
}
