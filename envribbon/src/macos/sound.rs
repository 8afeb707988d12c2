use objc2_app_kit::NSSound;
use objc2_foundation::NSString;

/// Play a named system sound (`/System/Library/Sounds`). Returns false if
/// the sound does not exist or could not start.
pub fn play_sound(name: &str) -> bool {
    let ns_name = NSString::from_str(name);
    let Some(sound) = (unsafe { NSSound::soundNamed(&ns_name) }) else {
        tracing::warn!("System sound not found: {}", name);
        return false;
    };
    let started = unsafe { sound.play() };
    tracing::debug!("Played sound {} (started: {})", name, started);
    started
}
