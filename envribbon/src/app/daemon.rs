use std::rc::Rc;
use std::time::Instant;

use envribbon_ipc::{Command, Response};
use tokio::sync::{mpsc, watch};

use crate::core::{
    AlertScheduler, Config, Coordinator, DragEvent, IpStatus, RibbonManager, SettingsStore,
};
use crate::platform::{OverlaySystem, SoundPlayer};
use crate::preferences::Preferences;
use crate::resolver::ResolverTrigger;

use super::dispatch::{process_command, RuntimeStatus};
use super::effects::execute_effects;

/// Main-thread state: settings, ribbons and the sound alert.
///
/// Inputs (IP changes, commands, drags, display changes) only mark the daemon
/// dirty; `flush` re-evaluates once per run loop tick.
pub struct Daemon<S: OverlaySystem, P: SoundPlayer> {
    pub(super) settings: SettingsStore,
    pub(super) coordinator: Coordinator,
    pub(super) ribbons: RibbonManager<S>,
    pub(super) alerts: AlertScheduler,
    pub(super) player: P,
    pub(super) trigger_tx: mpsc::Sender<ResolverTrigger>,
    pub(super) dirty: bool,
    pub(super) quit_requested: bool,
    ip_rx: watch::Receiver<IpStatus>,
    ip: IpStatus,
    resolver_gone: bool,
}

impl<S: OverlaySystem, P: SoundPlayer> Daemon<S, P> {
    pub fn new(
        config: &Config,
        prefs: Rc<dyn Preferences>,
        system: S,
        player: P,
        ip_rx: watch::Receiver<IpStatus>,
        trigger_tx: mpsc::Sender<ResolverTrigger>,
    ) -> Self {
        let settings = SettingsStore::load(prefs.clone());
        let ribbons = RibbonManager::new(system, prefs, config.ribbon_size, config.ribbon_margin);
        let ip = ip_rx.borrow().clone();
        Self {
            settings,
            coordinator: Coordinator::new(),
            ribbons,
            alerts: AlertScheduler::new(),
            player,
            trigger_tx,
            dirty: true,
            quit_requested: false,
            ip_rx,
            ip,
            resolver_gone: false,
        }
    }

    #[cfg(test)]
    pub fn current_ip(&self) -> &IpStatus {
        &self.ip
    }

    #[cfg(test)]
    pub fn ribbons(&self) -> &RibbonManager<S> {
        &self.ribbons
    }

    #[cfg(test)]
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Pick up the latest resolved IP, if it was published since the last call.
    pub fn poll_ip(&mut self) {
        match self.ip_rx.has_changed() {
            Ok(true) => {
                self.ip = self.ip_rx.borrow_and_update().clone();
                tracing::info!("Public IP: {}", self.ip);
                self.dirty = true;
            }
            Ok(false) => {}
            Err(_) => {
                if !std::mem::replace(&mut self.resolver_gone, true) {
                    tracing::warn!("IP resolver channel closed, keeping last status {}", self.ip);
                }
            }
        }
    }

    pub fn dispatch_command(&mut self, cmd: &Command, now: Instant) -> Response {
        tracing::debug!("IPC command: {:?}", cmd);
        let runtime = RuntimeStatus {
            ip: &self.ip,
            ribbon: self.coordinator.state(),
            ribbon_count: self.ribbons.ribbon_count(),
        };
        let result = process_command(&mut self.settings, &runtime, cmd);
        execute_effects(result.effects, self, now);
        result.response
    }

    pub fn handle_drag(&mut self, event: DragEvent) {
        self.ribbons.handle_drag(event);
    }

    /// Re-evaluate if anything changed, then run the alert timer.
    pub fn flush(&mut self, now: Instant) {
        if std::mem::take(&mut self.dirty) {
            let effects = self.coordinator.evaluate(&self.settings, &self.ip);
            execute_effects(effects, self, now);
        }
        self.alerts.tick(now, &self.player);
    }

    /// Save positions and tear down windows and the alert.
    pub fn shutdown(&mut self) {
        self.alerts.stop();
        self.ribbons.hide_ribbons();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use envribbon_ipc::{IpRule, RibbonColor};

    use super::*;
    use crate::platform::mock::{create_test_display, MockOverlaySystem, MockSoundPlayer};
    use crate::preferences::MemoryPreferences;

    struct Harness {
        daemon: Daemon<MockOverlaySystem, MockSoundPlayer>,
        ip_tx: watch::Sender<IpStatus>,
        trigger_rx: mpsc::Receiver<ResolverTrigger>,
        prefs: Rc<MemoryPreferences>,
    }

    fn harness(rules: Vec<IpRule>) -> Harness {
        let prefs = Rc::new(MemoryPreferences::new());
        let mut store = SettingsStore::load(prefs.clone());
        store.set_rules(rules);

        let system = MockOverlaySystem::new().with_displays(vec![
            create_test_display(0.0, 0.0, 1440.0, 900.0, 0.0, 0.0, 1440.0, 875.0),
            create_test_display(1440.0, 0.0, 1920.0, 1080.0, 1440.0, 0.0, 1920.0, 1080.0),
        ]);
        let (ip_tx, ip_rx) = watch::channel(IpStatus::Checking);
        let (trigger_tx, trigger_rx) = mpsc::channel(4);
        let daemon = Daemon::new(
            &Config::default(),
            prefs.clone(),
            system,
            MockSoundPlayer::new(),
            ip_rx,
            trigger_tx,
        );
        Harness {
            daemon,
            ip_tx,
            trigger_rx,
            prefs,
        }
    }

    fn labels(daemon: &Daemon<MockOverlaySystem, MockSoundPlayer>) -> Vec<String> {
        daemon
            .ribbons()
            .system()
            .live_labels()
            .into_iter()
            .map(|(label, _)| label)
            .collect()
    }

    #[test]
    fn test_initial_flush_with_checking_status() {
        let mut h = harness(vec![IpRule::new("1.2.3.4", "PROD", RibbonColor::RED)]);
        let now = Instant::now();

        h.daemon.flush(now);
        assert_eq!(h.daemon.ribbons().ribbon_count(), 0);

        h.daemon.dispatch_command(
            &Command::SetDefault {
                label: "DEV".to_string(),
                color: None,
            },
            now,
        );
        h.daemon.flush(now);
        assert_eq!(labels(&h.daemon), vec!["DEV", "DEV"]);
    }

    #[test]
    fn test_ip_change_shows_matching_rule() {
        let mut h = harness(vec![IpRule::new("1.2.3.4", "PROD", RibbonColor::RED)]);
        let now = Instant::now();
        h.daemon.flush(now);

        h.ip_tx.send_replace(IpStatus::Address("1.2.3.4".to_string()));
        h.daemon.poll_ip();
        assert_eq!(
            h.daemon.current_ip(),
            &IpStatus::Address("1.2.3.4".to_string())
        );
        h.daemon.flush(now);
        assert_eq!(labels(&h.daemon), vec!["PROD", "PROD"]);

        h.ip_tx.send_replace(IpStatus::NoConnection);
        h.daemon.poll_ip();
        h.daemon.flush(now);
        assert_eq!(h.daemon.ribbons().ribbon_count(), 0);
    }

    #[test]
    fn test_flush_without_changes_does_nothing() {
        let mut h = harness(vec![IpRule::new("1.2.3.4", "PROD", RibbonColor::RED)]);
        let now = Instant::now();
        h.ip_tx.send_replace(IpStatus::Address("1.2.3.4".to_string()));
        h.daemon.poll_ip();
        h.daemon.flush(now);
        let ops = h.daemon.ribbons().system().ops().len();

        h.daemon.poll_ip();
        h.daemon.flush(now);
        assert_eq!(h.daemon.ribbons().system().ops().len(), ops);
    }

    #[test]
    fn test_alert_plays_and_repeats() {
        let mut h = harness(vec![
            IpRule::new("1.2.3.4", "PROD", RibbonColor::RED).with_sound("Ping", 30)
        ]);
        let start = Instant::now();
        h.ip_tx.send_replace(IpStatus::Address("1.2.3.4".to_string()));
        h.daemon.poll_ip();
        h.daemon.flush(start);
        assert_eq!(h.daemon.player.played(), vec!["Ping"]);

        h.daemon.flush(start + Duration::from_secs(10));
        assert_eq!(h.daemon.player.played().len(), 1);

        h.daemon.flush(start + Duration::from_secs(30));
        assert_eq!(h.daemon.player.played().len(), 2);

        h.ip_tx.send_replace(IpStatus::Address("5.6.7.8".to_string()));
        h.daemon.poll_ip();
        h.daemon.flush(start + Duration::from_secs(40));
        h.daemon.flush(start + Duration::from_secs(120));
        assert_eq!(h.daemon.player.played().len(), 2);
    }

    #[test]
    fn test_add_rule_command_reevaluates() {
        let mut h = harness(vec![]);
        let now = Instant::now();
        h.ip_tx.send_replace(IpStatus::Address("1.2.3.4".to_string()));
        h.daemon.poll_ip();
        h.daemon.flush(now);
        assert_eq!(h.daemon.ribbons().ribbon_count(), 0);

        let response = h.daemon.dispatch_command(
            &Command::AddRule {
                ip: "1.2.3.4".to_string(),
                label: "PROD".to_string(),
                color: None,
                sound: None,
                interval: None,
            },
            now,
        );
        assert!(matches!(response, Response::Rule { .. }));
        h.daemon.flush(now);
        assert_eq!(labels(&h.daemon), vec!["PROD", "PROD"]);
        assert_eq!(h.daemon.settings().rules().len(), 1);
    }

    #[test]
    fn test_refresh_command_triggers_resolver() {
        let mut h = harness(vec![]);
        h.daemon.dispatch_command(&Command::Refresh, Instant::now());
        assert_eq!(h.trigger_rx.try_recv().ok(), Some(ResolverTrigger::Refresh));
    }

    #[test]
    fn test_test_sound_command_plays() {
        let mut h = harness(vec![]);
        h.daemon.dispatch_command(
            &Command::TestSound {
                name: "Hero".to_string(),
            },
            Instant::now(),
        );
        assert_eq!(h.daemon.player.played(), vec!["Hero"]);
    }

    #[test]
    fn test_quit_command() {
        let mut h = harness(vec![]);
        assert!(!h.daemon.quit_requested());
        h.daemon.dispatch_command(&Command::Quit, Instant::now());
        assert!(h.daemon.quit_requested());
    }

    #[test]
    fn test_display_change_rerenders() {
        let mut h = harness(vec![IpRule::new("1.2.3.4", "PROD", RibbonColor::RED)]);
        let now = Instant::now();
        h.ip_tx.send_replace(IpStatus::Address("1.2.3.4".to_string()));
        h.daemon.poll_ip();
        h.daemon.flush(now);
        assert_eq!(h.daemon.ribbons().ribbon_count(), 2);

        h.daemon.ribbons().system().set_displays(vec![create_test_display(
            0.0, 0.0, 1440.0, 900.0, 0.0, 0.0, 1440.0, 875.0,
        )]);
        h.daemon.mark_dirty();
        h.daemon.flush(now);
        assert_eq!(h.daemon.ribbons().ribbon_count(), 1);
        assert_eq!(h.daemon.ribbons().system().live_count(), 1);
    }

    #[test]
    fn test_closed_resolver_keeps_last_status() {
        let mut h = harness(vec![IpRule::new("1.2.3.4", "PROD", RibbonColor::RED)]);
        let now = Instant::now();
        h.ip_tx.send_replace(IpStatus::Address("1.2.3.4".to_string()));
        h.daemon.poll_ip();
        h.daemon.flush(now);
        assert!(!h.daemon.resolver_gone);

        drop(h.ip_tx);
        h.daemon.poll_ip();
        assert!(h.daemon.resolver_gone);
        h.daemon.poll_ip();
        h.daemon.flush(now);

        assert!(h.daemon.resolver_gone);
        assert_eq!(
            h.daemon.current_ip(),
            &IpStatus::Address("1.2.3.4".to_string())
        );
        assert_eq!(labels(&h.daemon), vec!["PROD", "PROD"]);
    }

    #[test]
    fn test_shutdown_persists_positions() {
        let mut h = harness(vec![IpRule::new("1.2.3.4", "PROD", RibbonColor::RED)]);
        let now = Instant::now();
        h.ip_tx.send_replace(IpStatus::Address("1.2.3.4".to_string()));
        h.daemon.poll_ip();
        h.daemon.flush(now);

        h.daemon.shutdown();
        assert_eq!(h.daemon.ribbons().system().live_count(), 0);
        assert!(h
            .prefs
            .contains("ribbonPosition_0.0,0.0,1440.0,900.0_x"));
        assert!(h
            .prefs
            .contains("ribbonPosition_1440.0,0.0,1920.0,1080.0_y"));
    }
}
