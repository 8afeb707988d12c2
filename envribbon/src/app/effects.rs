use std::time::Instant;

use envribbon_ipc::is_known_sound;

use crate::effect::Effect;
use crate::platform::{OverlaySystem, SoundPlayer};
use crate::resolver::ResolverTrigger;

use super::daemon::Daemon;

/// Execute side effects.
pub fn execute_effects<S: OverlaySystem, P: SoundPlayer>(
    effects: Vec<Effect>,
    daemon: &mut Daemon<S, P>,
    now: Instant,
) {
    for effect in effects {
        match effect {
            Effect::ShowRibbons { label, color } => {
                daemon.ribbons.show_ribbons(&label, color);
            }
            Effect::HideRibbons => {
                daemon.ribbons.hide_ribbons();
            }
            Effect::StartAlert(alert) => {
                daemon.alerts.start(alert, now, &daemon.player);
            }
            Effect::StopAlert => {
                daemon.alerts.stop();
            }
            Effect::PlaySound { name } => {
                if !daemon.player.play(&name) || !is_known_sound(&name) {
                    tracing::warn!("Sound not available: {}", name);
                }
            }
            Effect::Reevaluate => {
                daemon.dirty = true;
            }
            Effect::RefreshIp => {
                if let Err(e) = daemon.trigger_tx.try_send(ResolverTrigger::Refresh) {
                    tracing::warn!("Failed to request IP refresh: {}", e);
                }
            }
            Effect::Quit => {
                daemon.quit_requested = true;
            }
        }
    }
}
