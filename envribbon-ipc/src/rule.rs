use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const NO_SOUND: &str = "None";

/// System sounds that can be attached to a rule.
pub const AVAILABLE_SOUNDS: &[&str] = &[
    NO_SOUND,
    "Basso",
    "Blow",
    "Bottle",
    "Frog",
    "Funk",
    "Glass",
    "Hero",
    "Morse",
    "Ping",
    "Pop",
    "Purr",
    "Sosumi",
    "Submarine",
    "Tink",
];

pub fn is_known_sound(name: &str) -> bool {
    AVAILABLE_SOUNDS.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// RGBA color of a ribbon, persisted as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RibbonColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RibbonColor {
    // System palette (light appearance)
    pub const RED: Self = Self::rgb(255, 59, 48);
    pub const ORANGE: Self = Self::rgb(255, 149, 0);
    pub const YELLOW: Self = Self::rgb(255, 204, 0);
    pub const GREEN: Self = Self::rgb(52, 199, 89);
    pub const MINT: Self = Self::rgb(0, 199, 190);
    pub const TEAL: Self = Self::rgb(48, 176, 199);
    pub const CYAN: Self = Self::rgb(50, 173, 230);
    pub const BLUE: Self = Self::rgb(0, 122, 255);
    pub const INDIGO: Self = Self::rgb(88, 86, 214);
    pub const PURPLE: Self = Self::rgb(175, 82, 222);
    pub const PINK: Self = Self::rgb(255, 45, 85);
    pub const BROWN: Self = Self::rgb(162, 132, 94);
    pub const GRAY: Self = Self::rgb(142, 142, 147);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Components as 0.0..=1.0 floats, in r, g, b, a order.
    pub fn components(&self) -> (f64, f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
            self.a as f64 / 255.0,
        )
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "red" => Self::RED,
            "orange" => Self::ORANGE,
            "yellow" => Self::YELLOW,
            "green" => Self::GREEN,
            "mint" => Self::MINT,
            "teal" => Self::TEAL,
            "cyan" => Self::CYAN,
            "blue" => Self::BLUE,
            "indigo" => Self::INDIGO,
            "purple" => Self::PURPLE,
            "pink" => Self::PINK,
            "brown" => Self::BROWN,
            "gray" | "grey" => Self::GRAY,
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            _ => return None,
        };
        Some(color)
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }
}

impl FromStr for RibbonColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::from_hex(hex).ok_or_else(|| format!("Invalid hex color: {}", s));
        }
        Self::named(&s.to_lowercase())
            .or_else(|| Self::from_hex(s))
            .ok_or_else(|| format!("Unknown color: {} (use #RRGGBB[AA] or a color name)", s))
    }
}

impl fmt::Display for RibbonColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

impl TryFrom<String> for RibbonColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RibbonColor> for String {
    fn from(color: RibbonColor) -> Self {
        color.to_string()
    }
}

fn red() -> RibbonColor {
    RibbonColor::RED
}

fn no_sound() -> String {
    NO_SOUND.to_string()
}

/// Undecodable colors fall back to red instead of failing the whole rule list.
fn lenient_color<'de, D>(deserializer: D) -> Result<RibbonColor, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(RibbonColor::RED))
}

/// A user rule: when the public IP equals `ip`, show `label` in `color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpRule {
    pub id: Uuid,
    pub ip: String,
    #[serde(rename = "ribbonText")]
    pub label: String,
    #[serde(
        rename = "ribbonColor",
        default = "red",
        deserialize_with = "lenient_color"
    )]
    pub color: RibbonColor,
    #[serde(rename = "soundName", default = "no_sound")]
    pub sound: String,
    #[serde(default)]
    pub sound_interval: u32,
}

impl IpRule {
    pub fn new(ip: impl Into<String>, label: impl Into<String>, color: RibbonColor) -> Self {
        Self {
            id: Uuid::new_v4(),
            ip: ip.into(),
            label: label.into(),
            color,
            sound: no_sound(),
            sound_interval: 0,
        }
    }

    pub fn with_sound(mut self, sound: impl Into<String>, interval: u32) -> Self {
        self.sound = sound.into();
        self.sound_interval = interval;
        self
    }

    pub fn matches(&self, ip: &str) -> bool {
        !self.ip.is_empty() && self.ip == ip
    }

    /// The alert configured for this rule, if any.
    pub fn alert(&self) -> Option<SoundAlert> {
        SoundAlert::new(&self.sound, self.sound_interval)
    }
}

/// Fallback ribbon shown when no rule matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRibbon {
    pub label: String,
    pub color: RibbonColor,
}

impl Default for DefaultRibbon {
    fn default() -> Self {
        Self {
            label: String::new(),
            color: RibbonColor::GRAY,
        }
    }
}

/// A sound played when a rule matches. `interval_secs == 0` plays once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundAlert {
    pub sound: String,
    pub interval_secs: u32,
}

impl SoundAlert {
    pub fn new(sound: &str, interval_secs: u32) -> Option<Self> {
        if sound.is_empty() || sound == NO_SOUND {
            return None;
        }
        Some(Self {
            sound: sound.to_string(),
            interval_secs,
        })
    }

    pub fn repeats(&self) -> bool {
        self.interval_secs > 0
    }
}
