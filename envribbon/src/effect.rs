use envribbon_ipc::{RibbonColor, Response, SoundAlert};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowRibbons { label: String, color: RibbonColor },
    HideRibbons,
    StartAlert(SoundAlert),
    StopAlert,
    PlaySound { name: String },
    /// Settings changed, re-evaluate on the next flush.
    Reevaluate,
    RefreshIp,
    Quit,
}

pub struct CommandResult {
    pub response: Response,
    pub effects: Vec<Effect>,
}

impl CommandResult {
    pub fn ok_with_effects(effects: Vec<Effect>) -> Self {
        Self {
            response: Response::Ok,
            effects,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            response: Response::Error {
                message: message.into(),
            },
            effects: vec![],
        }
    }

    pub fn with_response(response: Response) -> Self {
        Self {
            response,
            effects: vec![],
        }
    }

    pub fn with_effects(response: Response, effects: Vec<Effect>) -> Self {
        Self { response, effects }
    }
}
