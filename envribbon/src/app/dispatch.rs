use envribbon_ipc::{
    Command, IpRule, Response, RibbonColor, StatusInfo, AVAILABLE_SOUNDS, NO_SOUND,
};

use crate::core::{IpStatus, RibbonState, SettingsStore};
use crate::effect::{CommandResult, Effect};

/// Runtime values reported by `get_status`.
pub struct RuntimeStatus<'a> {
    pub ip: &'a IpStatus,
    pub ribbon: &'a RibbonState,
    pub ribbon_count: usize,
}

/// Apply a control command to the settings. Side effects are returned,
/// not performed.
pub fn process_command(
    settings: &mut SettingsStore,
    runtime: &RuntimeStatus<'_>,
    cmd: &Command,
) -> CommandResult {
    match cmd {
        Command::GetStatus => CommandResult::with_response(Response::Status {
            status: status_info(settings, runtime),
        }),
        Command::ListRules => CommandResult::with_response(Response::Rules {
            rules: settings.rules().to_vec(),
        }),
        Command::ListSounds => CommandResult::with_response(Response::Sounds {
            sounds: AVAILABLE_SOUNDS.iter().map(|s| s.to_string()).collect(),
        }),
        Command::AddRule {
            ip,
            label,
            color,
            sound,
            interval,
        } => {
            let sound = match sound.as_deref().map(canonical_sound).transpose() {
                Ok(sound) => sound.unwrap_or(NO_SOUND),
                Err(e) => return CommandResult::error(e),
            };
            let rule = IpRule::new(ip.trim(), label.clone(), color.unwrap_or(RibbonColor::RED))
                .with_sound(sound, interval.unwrap_or(0));
            let rule = settings.add_rule(rule).clone();
            CommandResult::with_effects(Response::Rule { rule }, vec![Effect::Reevaluate])
        }
        Command::UpdateRule { id, changes } => {
            if changes.is_empty() {
                return CommandResult::error("No changes given");
            }
            let mut changes = changes.clone();
            if let Some(sound) = &changes.sound {
                match canonical_sound(sound) {
                    Ok(name) => changes.sound = Some(name.to_string()),
                    Err(e) => return CommandResult::error(e),
                }
            }
            if let Some(ip) = &changes.ip {
                changes.ip = Some(ip.trim().to_string());
            }
            match settings.update_rule(*id, &changes) {
                Some(rule) => CommandResult::with_effects(
                    Response::Rule { rule: rule.clone() },
                    vec![Effect::Reevaluate],
                ),
                None => CommandResult::error(format!("Rule not found: {}", id)),
            }
        }
        Command::RemoveRule { id } => {
            if settings.remove_rule(*id) {
                CommandResult::ok_with_effects(vec![Effect::Reevaluate])
            } else {
                CommandResult::error(format!("Rule not found: {}", id))
            }
        }
        Command::SetDefault { label, color } => {
            let color = color.unwrap_or(settings.default_ribbon().color);
            settings.set_default(label.clone(), color);
            CommandResult::ok_with_effects(vec![Effect::Reevaluate])
        }
        Command::Refresh => CommandResult::ok_with_effects(vec![Effect::RefreshIp]),
        Command::TestSound { name } => match canonical_sound(name) {
            Ok(NO_SOUND) => CommandResult::error("Sound \"None\" cannot be played"),
            Ok(name) => CommandResult::ok_with_effects(vec![Effect::PlaySound {
                name: name.to_string(),
            }]),
            Err(e) => CommandResult::error(e),
        },
        Command::Quit => {
            tracing::info!("Quit command received");
            CommandResult::ok_with_effects(vec![Effect::Quit])
        }
    }
}

/// Case-insensitive lookup in the sound list, returning its spelling.
fn canonical_sound(name: &str) -> Result<&'static str, String> {
    if name.trim().is_empty() {
        return Ok(NO_SOUND);
    }
    AVAILABLE_SOUNDS
        .iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            format!(
                "Unknown sound: {} (available: {})",
                name,
                AVAILABLE_SOUNDS.join(", ")
            )
        })
}

fn status_info(settings: &SettingsStore, runtime: &RuntimeStatus<'_>) -> StatusInfo {
    let (ribbon, ribbon_color) = match runtime.ribbon {
        RibbonState::Shown(spec) => (Some(spec.label.clone()), Some(spec.color)),
        RibbonState::Hidden => (None, None),
    };
    StatusInfo {
        current_ip: runtime.ip.to_string(),
        matched_rule: runtime
            .ip
            .address()
            .and_then(|ip| settings.match_rule(ip))
            .map(|rule| rule.id),
        ribbon,
        ribbon_color,
        ribbon_count: runtime.ribbon_count,
        default_ribbon: settings.default_ribbon().clone(),
        rule_count: settings.rules().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RibbonSpec;
    use crate::preferences::MemoryPreferences;
    use envribbon_ipc::RuleChanges;
    use std::rc::Rc;
    use uuid::Uuid;

    fn settings() -> SettingsStore {
        SettingsStore::load(Rc::new(MemoryPreferences::new()))
    }

    fn run(settings: &mut SettingsStore, cmd: Command) -> CommandResult {
        let ip = IpStatus::Address("1.2.3.4".to_string());
        let runtime = RuntimeStatus {
            ip: &ip,
            ribbon: &RibbonState::Hidden,
            ribbon_count: 0,
        };
        process_command(settings, &runtime, &cmd)
    }

    fn add_rule(ip: &str, label: &str) -> Command {
        Command::AddRule {
            ip: ip.to_string(),
            label: label.to_string(),
            color: None,
            sound: None,
            interval: None,
        }
    }

    #[test]
    fn test_add_rule_defaults() {
        let mut store = settings();
        let result = run(&mut store, add_rule(" 1.2.3.4 ", "PROD"));

        match result.response {
            Response::Rule { rule } => {
                assert_eq!(rule.ip, "1.2.3.4");
                assert_eq!(rule.color, RibbonColor::RED);
                assert_eq!(rule.sound, NO_SOUND);
                assert_eq!(rule.sound_interval, 0);
            }
            other => panic!("Unexpected response: {:?}", other),
        }
        assert_eq!(result.effects, vec![Effect::Reevaluate]);
        assert_eq!(store.rules().len(), 1);
    }

    #[test]
    fn test_add_rule_canonicalizes_sound() {
        let mut store = settings();
        let cmd = Command::AddRule {
            ip: "1.2.3.4".to_string(),
            label: "PROD".to_string(),
            color: Some(RibbonColor::BLUE),
            sound: Some("submarine".to_string()),
            interval: Some(30),
        };
        run(&mut store, cmd);

        assert_eq!(store.rules()[0].sound, "Submarine");
        assert_eq!(store.rules()[0].sound_interval, 30);
        assert_eq!(store.rules()[0].color, RibbonColor::BLUE);
    }

    #[test]
    fn test_add_rule_unknown_sound_rejected() {
        let mut store = settings();
        let cmd = Command::AddRule {
            ip: "1.2.3.4".to_string(),
            label: "PROD".to_string(),
            color: None,
            sound: Some("Beep".to_string()),
            interval: None,
        };
        let result = run(&mut store, cmd);

        assert!(matches!(result.response, Response::Error { .. }));
        assert!(result.effects.is_empty());
        assert!(store.rules().is_empty());
    }

    #[test]
    fn test_update_rule() {
        let mut store = settings();
        run(&mut store, add_rule("1.2.3.4", "PROD"));
        let id = store.rules()[0].id;

        let result = run(
            &mut store,
            Command::UpdateRule {
                id,
                changes: RuleChanges {
                    label: Some("LIVE".to_string()),
                    sound: Some("ping".to_string()),
                    ..Default::default()
                },
            },
        );

        assert_eq!(result.effects, vec![Effect::Reevaluate]);
        assert_eq!(store.rules()[0].label, "LIVE");
        assert_eq!(store.rules()[0].sound, "Ping");
    }

    #[test]
    fn test_update_rule_errors() {
        let mut store = settings();
        run(&mut store, add_rule("1.2.3.4", "PROD"));
        let id = store.rules()[0].id;

        let empty = run(
            &mut store,
            Command::UpdateRule {
                id,
                changes: RuleChanges::default(),
            },
        );
        assert!(matches!(empty.response, Response::Error { .. }));

        let missing = run(
            &mut store,
            Command::UpdateRule {
                id: Uuid::new_v4(),
                changes: RuleChanges {
                    label: Some("X".to_string()),
                    ..Default::default()
                },
            },
        );
        match missing.response {
            Response::Error { message } => assert!(message.starts_with("Rule not found")),
            other => panic!("Unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_remove_rule() {
        let mut store = settings();
        run(&mut store, add_rule("1.2.3.4", "PROD"));
        let id = store.rules()[0].id;

        let result = run(&mut store, Command::RemoveRule { id });
        assert!(matches!(result.response, Response::Ok));
        assert!(store.rules().is_empty());

        let again = run(&mut store, Command::RemoveRule { id });
        assert!(matches!(again.response, Response::Error { .. }));
        assert!(again.effects.is_empty());
    }

    #[test]
    fn test_set_default_keeps_color_when_omitted() {
        let mut store = settings();
        run(
            &mut store,
            Command::SetDefault {
                label: "DEV".to_string(),
                color: Some(RibbonColor::PURPLE),
            },
        );
        run(
            &mut store,
            Command::SetDefault {
                label: "STAGE".to_string(),
                color: None,
            },
        );

        assert_eq!(store.default_ribbon().label, "STAGE");
        assert_eq!(store.default_ribbon().color, RibbonColor::PURPLE);
    }

    #[test]
    fn test_get_status() {
        let mut store = settings();
        run(&mut store, add_rule("1.2.3.4", "PROD"));
        let id = store.rules()[0].id;

        let ip = IpStatus::Address("1.2.3.4".to_string());
        let ribbon = RibbonState::Shown(RibbonSpec {
            label: "PROD".to_string(),
            color: RibbonColor::RED,
        });
        let runtime = RuntimeStatus {
            ip: &ip,
            ribbon: &ribbon,
            ribbon_count: 2,
        };
        let result = process_command(&mut store, &runtime, &Command::GetStatus);

        match result.response {
            Response::Status { status } => {
                assert_eq!(status.current_ip, "1.2.3.4");
                assert_eq!(status.matched_rule, Some(id));
                assert_eq!(status.ribbon.as_deref(), Some("PROD"));
                assert_eq!(status.ribbon_count, 2);
                assert_eq!(status.rule_count, 1);
            }
            other => panic!("Unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_get_status_while_offline() {
        let mut store = settings();
        let ip = IpStatus::NoConnection;
        let runtime = RuntimeStatus {
            ip: &ip,
            ribbon: &RibbonState::Hidden,
            ribbon_count: 0,
        };
        match process_command(&mut store, &runtime, &Command::GetStatus).response {
            Response::Status { status } => {
                assert_eq!(status.current_ip, "No Connection");
                assert_eq!(status.matched_rule, None);
                assert_eq!(status.ribbon, None);
            }
            other => panic!("Unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_test_sound() {
        let mut store = settings();
        let result = run(
            &mut store,
            Command::TestSound {
                name: "glass".to_string(),
            },
        );
        assert_eq!(
            result.effects,
            vec![Effect::PlaySound {
                name: "Glass".to_string()
            }]
        );

        let none = run(
            &mut store,
            Command::TestSound {
                name: "None".to_string(),
            },
        );
        assert!(matches!(none.response, Response::Error { .. }));
    }

    #[test]
    fn test_refresh_and_quit_effects() {
        let mut store = settings();
        assert_eq!(
            run(&mut store, Command::Refresh).effects,
            vec![Effect::RefreshIp]
        );
        assert_eq!(run(&mut store, Command::Quit).effects, vec![Effect::Quit]);
    }

    #[test]
    fn test_list_sounds() {
        let mut store = settings();
        match run(&mut store, Command::ListSounds).response {
            Response::Sounds { sounds } => {
                assert_eq!(sounds.len(), AVAILABLE_SOUNDS.len());
                assert_eq!(sounds[0], NO_SOUND);
            }
            other => panic!("Unexpected response: {:?}", other),
        }
    }
}
