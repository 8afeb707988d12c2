use envribbon_ipc::SoundAlert;
use uuid::Uuid;

use super::{IpStatus, RibbonSpec, SettingsStore};
use crate::effect::Effect;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RibbonState {
    #[default]
    Hidden,
    Shown(RibbonSpec),
}

/// Maps (current IP, settings) to ribbon and alert effects.
#[derive(Debug, Default)]
pub struct Coordinator {
    state: RibbonState,
    alert: Option<(Uuid, SoundAlert)>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RibbonState {
        &self.state
    }

    pub fn evaluate(&mut self, settings: &SettingsStore, status: &IpStatus) -> Vec<Effect> {
        let mut effects = Vec::new();
        let ip = status.address();

        match settings.effective_rule(ip) {
            Some(spec) => {
                // Re-shown even when unchanged so new displays get a ribbon
                effects.push(Effect::ShowRibbons {
                    label: spec.label.clone(),
                    color: spec.color,
                });
                self.state = RibbonState::Shown(spec);
            }
            None => {
                if matches!(self.state, RibbonState::Shown(_)) {
                    effects.push(Effect::HideRibbons);
                }
                self.state = RibbonState::Hidden;
            }
        }

        let wanted = ip
            .and_then(|ip| settings.match_rule(ip))
            .and_then(|rule| rule.alert().map(|alert| (rule.id, alert)));
        if wanted != self.alert {
            match &wanted {
                Some((_, alert)) => effects.push(Effect::StartAlert(alert.clone())),
                None => effects.push(Effect::StopAlert),
            }
            self.alert = wanted;
        }

        tracing::debug!("Evaluated {} -> {:?}", status, self.state);
        effects
    }
}
