pub mod command;
pub mod rule;

pub use command::{Command, Response, RuleChanges, StatusInfo};
pub use rule::{
    is_known_sound, DefaultRibbon, IpRule, RibbonColor, SoundAlert, AVAILABLE_SOUNDS, NO_SOUND,
};
