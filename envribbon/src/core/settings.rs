use std::rc::Rc;

use envribbon_ipc::{DefaultRibbon, IpRule, RibbonColor, RuleChanges};
use serde_json::Value;
use uuid::Uuid;

use crate::preferences::Preferences;

pub const KEY_RULES: &str = "ipConfigs";
pub const KEY_DEFAULT_TEXT: &str = "defaultRibbonText";
pub const KEY_DEFAULT_COLOR: &str = "defaultRibbonColor";

// Single-rule model, migrated on first load
const LEGACY_KEY_IP: &str = "targetIP";
const LEGACY_KEY_TEXT: &str = "ribbonText";
const LEGACY_KEY_COLOR: &str = "ribbonColor";

/// Label and color a ribbon should be drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonSpec {
    pub label: String,
    pub color: RibbonColor,
}

/// IP rules plus the default ribbon, persisted on every mutation.
pub struct SettingsStore {
    rules: Vec<IpRule>,
    default_ribbon: DefaultRibbon,
    prefs: Rc<dyn Preferences>,
}

impl SettingsStore {
    pub fn load(prefs: Rc<dyn Preferences>) -> Self {
        let default_ribbon = DefaultRibbon {
            label: prefs.get_string(KEY_DEFAULT_TEXT).unwrap_or_default(),
            color: load_color(prefs.as_ref(), KEY_DEFAULT_COLOR).unwrap_or(RibbonColor::GRAY),
        };

        let rules = match prefs.get(KEY_RULES) {
            Some(value) => decode_rules(value),
            None => migrate_legacy(prefs.as_ref()),
        };

        tracing::info!(
            "Loaded {} IP rules (default ribbon: {:?})",
            rules.len(),
            default_ribbon.label
        );

        Self {
            rules,
            default_ribbon,
            prefs,
        }
    }

    pub fn rules(&self) -> &[IpRule] {
        &self.rules
    }

    pub fn default_ribbon(&self) -> &DefaultRibbon {
        &self.default_ribbon
    }

    /// First rule in list order whose address equals `ip` exactly.
    pub fn match_rule(&self, ip: &str) -> Option<&IpRule> {
        self.rules.iter().find(|r| r.matches(ip))
    }

    /// The ribbon to show for `ip`: the matched rule, else the default
    /// ribbon. `None` when the resulting label is empty.
    pub fn effective_rule(&self, ip: Option<&str>) -> Option<RibbonSpec> {
        let (label, color) = match ip.and_then(|ip| self.match_rule(ip)) {
            Some(rule) => (&rule.label, rule.color),
            None => (&self.default_ribbon.label, self.default_ribbon.color),
        };
        if label.is_empty() {
            return None;
        }
        Some(RibbonSpec {
            label: label.clone(),
            color,
        })
    }

    pub fn add_rule(&mut self, rule: IpRule) -> &IpRule {
        tracing::info!("Adding rule: {} -> {:?}", rule.ip, rule.label);
        self.rules.push(rule);
        self.save_rules();
        &self.rules[self.rules.len() - 1]
    }

    pub fn update_rule(&mut self, id: Uuid, changes: &RuleChanges) -> Option<&IpRule> {
        let index = self.rules.iter().position(|r| r.id == id)?;
        changes.apply(&mut self.rules[index]);
        tracing::info!("Updated rule {}: {:?}", id, changes);
        self.save_rules();
        Some(&self.rules[index])
    }

    pub fn remove_rule(&mut self, id: Uuid) -> bool {
        let initial_len = self.rules.len();
        self.rules.retain(|r| r.id != id);
        let removed = self.rules.len() < initial_len;
        if removed {
            tracing::info!("Removed rule {}", id);
            self.save_rules();
        }
        removed
    }

    #[cfg(test)]
    pub fn set_rules(&mut self, rules: Vec<IpRule>) {
        self.rules = rules;
        self.save_rules();
    }

    pub fn set_default(&mut self, label: String, color: RibbonColor) {
        tracing::info!("Set default ribbon: {:?} {}", label, color);
        self.prefs.set_string(KEY_DEFAULT_TEXT, &label);
        self.prefs.set_string(KEY_DEFAULT_COLOR, &color.to_string());
        self.default_ribbon = DefaultRibbon { label, color };
    }

    fn save_rules(&self) {
        match serde_json::to_value(&self.rules) {
            Ok(value) => self.prefs.set(KEY_RULES, value),
            Err(e) => tracing::warn!("Failed to encode IP rules: {}", e),
        }
    }
}

fn load_color(prefs: &dyn Preferences, key: &str) -> Option<RibbonColor> {
    let raw = prefs.get_string(key)?;
    match raw.parse() {
        Ok(color) => Some(color),
        Err(e) => {
            tracing::warn!("Ignoring stored color {}: {}", key, e);
            None
        }
    }
}

fn decode_rules(value: Value) -> Vec<IpRule> {
    // Stored either as a JSON array or as a JSON-encoded string of one
    let value = match value {
        Value::String(s) => match serde_json::from_str(&s) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Stored IP rules are corrupt, starting empty: {}", e);
                return Vec::new();
            }
        },
        other => other,
    };
    match serde_json::from_value(value) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!("Stored IP rules are corrupt, starting empty: {}", e);
            Vec::new()
        }
    }
}

fn migrate_legacy(prefs: &dyn Preferences) -> Vec<IpRule> {
    let Some(ip) = prefs.get_string(LEGACY_KEY_IP).filter(|ip| !ip.is_empty()) else {
        return Vec::new();
    };

    let label = prefs
        .get_string(LEGACY_KEY_TEXT)
        .unwrap_or_else(|| "ENV".to_string());
    let color = load_color(prefs, LEGACY_KEY_COLOR).unwrap_or(RibbonColor::RED);
    let rules = vec![IpRule::new(ip, label, color)];

    match serde_json::to_value(&rules) {
        Ok(value) => prefs.set(KEY_RULES, value),
        Err(e) => tracing::warn!("Failed to encode migrated rule: {}", e),
    }
    for key in [LEGACY_KEY_IP, LEGACY_KEY_TEXT, LEGACY_KEY_COLOR] {
        prefs.remove(key);
    }

    tracing::info!("Migrated legacy single-IP settings to rule list");
    rules
}
