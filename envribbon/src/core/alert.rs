use std::time::{Duration, Instant};

use envribbon_ipc::SoundAlert;

use crate::platform::SoundPlayer;

#[derive(Debug)]
struct ActiveAlert {
    alert: SoundAlert,
    next_due: Option<Instant>,
}

/// Plays the sound of the active alert, once or every `interval_secs`.
/// Driven by the run loop tick; time is passed in so tests control it.
#[derive(Debug, Default)]
pub struct AlertScheduler {
    active: Option<ActiveAlert>,
}

impl AlertScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&SoundAlert> {
        self.active.as_ref().map(|a| &a.alert)
    }

    /// Replace any running alert, playing the new sound right away.
    pub fn start<P: SoundPlayer>(&mut self, alert: SoundAlert, now: Instant, player: &P) {
        tracing::info!(
            "Starting sound alert {} (interval {}s)",
            alert.sound,
            alert.interval_secs
        );
        player.play(&alert.sound);
        let next_due = alert
            .repeats()
            .then(|| now + Duration::from_secs(alert.interval_secs as u64));
        self.active = Some(ActiveAlert { alert, next_due });
    }

    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::info!("Stopped sound alert {}", active.alert.sound);
        }
    }

    pub fn tick<P: SoundPlayer>(&mut self, now: Instant, player: &P) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(due) = active.next_due else {
            return;
        };
        if now < due {
            return;
        }

        player.play(&active.alert.sound);
        // Missed repeats (sleep, long stalls) collapse into one
        let interval = Duration::from_secs(active.alert.interval_secs as u64);
        let mut next = due + interval;
        while next <= now {
            next += interval;
        }
        active.next_due = Some(next);
    }
}
