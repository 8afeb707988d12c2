use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::{DefaultRibbon, IpRule, RibbonColor};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // Queries
    GetStatus,
    ListRules,
    ListSounds,

    // Rule operations
    AddRule {
        ip: String,
        label: String,
        color: Option<RibbonColor>,
        sound: Option<String>,
        interval: Option<u32>,
    },
    UpdateRule {
        id: Uuid,
        #[serde(flatten)]
        changes: RuleChanges,
    },
    RemoveRule {
        id: Uuid,
    },

    // Default ribbon
    SetDefault {
        label: String,
        color: Option<RibbonColor>,
    },

    // Actions
    Refresh,
    TestSound {
        name: String,
    },

    // Control
    Quit,
}

/// Partial update of a rule; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleChanges {
    pub ip: Option<String>,
    pub label: Option<String>,
    pub color: Option<RibbonColor>,
    pub sound: Option<String>,
    pub interval: Option<u32>,
}

impl RuleChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, rule: &mut IpRule) {
        if let Some(ip) = &self.ip {
            rule.ip = ip.clone();
        }
        if let Some(label) = &self.label {
            rule.label = label.clone();
        }
        if let Some(color) = self.color {
            rule.color = color;
        }
        if let Some(sound) = &self.sound {
            rule.sound = sound.clone();
        }
        if let Some(interval) = self.interval {
            rule.sound_interval = interval;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Error { message: String },
    Status { status: StatusInfo },
    Rules { rules: Vec<IpRule> },
    Rule { rule: IpRule },
    Sounds { sounds: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Current public IP or a status text such as "No Connection".
    pub current_ip: String,
    pub matched_rule: Option<Uuid>,
    /// Label shown on the ribbons, `None` while hidden.
    pub ribbon: Option<String>,
    pub ribbon_color: Option<RibbonColor>,
    pub ribbon_count: usize,
    pub default_ribbon: DefaultRibbon,
    pub rule_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_get_status_serialization() {
        let json = serde_json::to_string(&Command::GetStatus).unwrap();
        assert_eq!(json, r#"{"type":"get_status"}"#);

        let deserialized: Command = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, Command::GetStatus));
    }

    #[test]
    fn test_command_add_rule_serialization() {
        let cmd = Command::AddRule {
            ip: "1.2.3.4".to_string(),
            label: "PROD".to_string(),
            color: Some(RibbonColor::rgb(255, 0, 0)),
            sound: None,
            interval: None,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"type\":\"add_rule\""));
        assert!(json.contains("\"color\":\"#FF0000\""));

        let deserialized: Command = serde_json::from_str(&json).unwrap();
        match deserialized {
            Command::AddRule {
                ip, label, color, ..
            } => {
                assert_eq!(ip, "1.2.3.4");
                assert_eq!(label, "PROD");
                assert_eq!(color, Some(RibbonColor::rgb(255, 0, 0)));
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_command_update_rule_flattened_changes() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"update_rule","id":"{}","label":"STAGING"}}"#, id);
        let cmd: Command = serde_json::from_str(&json).unwrap();
        match cmd {
            Command::UpdateRule { id: got, changes } => {
                assert_eq!(got, id);
                assert_eq!(changes.label.as_deref(), Some("STAGING"));
                assert!(changes.ip.is_none());
                assert!(changes.color.is_none());
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_command_invalid_color_rejected() {
        let json = r#"{"type":"set_default","label":"DEV","color":"not-a-color"}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }

    #[test]
    fn test_rule_changes_apply() {
        let mut rule = IpRule::new("1.2.3.4", "PROD", RibbonColor::RED);
        let changes = RuleChanges {
            label: Some("LIVE".to_string()),
            interval: Some(15),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        changes.apply(&mut rule);

        assert_eq!(rule.ip, "1.2.3.4");
        assert_eq!(rule.label, "LIVE");
        assert_eq!(rule.sound_interval, 15);
        assert!(RuleChanges::default().is_empty());
    }

    #[test]
    fn test_response_error_serialization() {
        let resp = Response::Error {
            message: "Rule not found".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("Rule not found"));
    }

    #[test]
    fn test_response_status_roundtrip() {
        let resp = Response::Status {
            status: StatusInfo {
                current_ip: "1.2.3.4".to_string(),
                matched_rule: None,
                ribbon: Some("DEV".to_string()),
                ribbon_color: Some(RibbonColor::GRAY),
                ribbon_count: 2,
                default_ribbon: DefaultRibbon::default(),
                rule_count: 0,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        let deserialized: Response = serde_json::from_str(&json).unwrap();
        match deserialized {
            Response::Status { status } => {
                assert_eq!(status.current_ip, "1.2.3.4");
                assert_eq!(status.ribbon.as_deref(), Some("DEV"));
                assert_eq!(status.ribbon_count, 2);
            }
            _ => panic!("Wrong variant"),
        }
    }
}
