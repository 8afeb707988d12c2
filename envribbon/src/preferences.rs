use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Key-value persistence for settings and ribbon positions.
/// Writes take `&self` so one store can be shared between services.
pub trait Preferences {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn remove(&self, key: &str);

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    fn set_string(&self, key: &str, value: &str) {
        self.set(key, Value::String(value.to_string()));
    }

    fn set_f64(&self, key: &str, value: f64) {
        match serde_json::Number::from_f64(value) {
            Some(n) => self.set(key, Value::Number(n)),
            None => tracing::warn!("Refusing to store non-finite value for {}", key),
        }
    }
}

pub fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("envribbon")
        .join("preferences.json")
}

/// Preferences stored as a single JSON object, rewritten on every change.
pub struct JsonFilePreferences {
    path: PathBuf,
    values: RefCell<Map<String, Value>>,
}

impl JsonFilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match load_map(&path) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("Ignoring unreadable preferences {:?}: {:#}", path, e);
                Map::new()
            }
        };
        tracing::info!("Loaded {} preference keys from {:?}", values.len(), path);
        Self {
            path,
            values: RefCell::new(values),
        }
    }

    fn save(&self) {
        if let Err(e) = self.write() {
            tracing::warn!("Failed to save preferences to {:?}: {:#}", self.path, e);
        }
    }

    fn write(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
        let json = serde_json::to_string_pretty(&*self.values.borrow())?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }
}

fn load_map(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let data = std::fs::read_to_string(path)?;
    match serde_json::from_str(&data)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, found {}", other),
    }
}

impl Preferences for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
        self.save();
    }

    fn remove(&self, key: &str) {
        if self.values.borrow_mut().remove(key).is_some() {
            self.save();
        }
    }
}

/// In-memory preferences, used by tests.
#[derive(Default)]
pub struct MemoryPreferences {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("envribbon-test-{}-{}", std::process::id(), name))
            .join("preferences.json")
    }

    #[test]
    fn test_memory_typed_accessors() {
        let prefs = MemoryPreferences::new();
        prefs.set_string("label", "DEV");
        prefs.set_f64("x", 12.5);

        assert_eq!(prefs.get_string("label").as_deref(), Some("DEV"));
        assert_eq!(prefs.get_f64("x"), Some(12.5));
        assert_eq!(prefs.get_string("x"), None);
        assert_eq!(prefs.get_f64("missing"), None);
    }

    #[test]
    fn test_memory_remove() {
        let prefs = MemoryPreferences::new();
        prefs.set_string("k", "v");
        assert!(prefs.contains("k"));
        prefs.remove("k");
        assert!(!prefs.contains("k"));
    }

    #[test]
    fn test_non_finite_values_are_not_stored() {
        let prefs = MemoryPreferences::new();
        prefs.set_f64("nan", f64::NAN);
        assert!(!prefs.contains("nan"));
    }

    #[test]
    fn test_file_preferences_persist_across_reopen() {
        let path = temp_path("reopen");
        let _ = std::fs::remove_file(&path);

        let prefs = JsonFilePreferences::open(&path);
        prefs.set_string("defaultRibbonText", "DEV");
        prefs.set_f64("ribbonPosition_0,0,1440,900_x", 100.0);
        drop(prefs);

        let reopened = JsonFilePreferences::open(&path);
        assert_eq!(
            reopened.get_string("defaultRibbonText").as_deref(),
            Some("DEV")
        );
        assert_eq!(reopened.get_f64("ribbonPosition_0,0,1440,900_x"), Some(100.0));

        reopened.remove("defaultRibbonText");
        let again = JsonFilePreferences::open(&path);
        assert_eq!(again.get_string("defaultRibbonText"), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let prefs = JsonFilePreferences::open(&path);
        assert_eq!(prefs.get("anything"), None);

        prefs.set_string("k", "v");
        let reopened = JsonFilePreferences::open(&path);
        assert_eq!(reopened.get_string("k").as_deref(), Some("v"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
