mod alert;
mod config;
mod coordinator;
mod display;
mod geometry;
mod ip;
mod overlay;
mod settings;

pub use alert::*;
pub use config::*;
pub use coordinator::*;
pub use display::*;
pub use geometry::*;
pub use ip::*;
pub use overlay::*;
pub use settings::*;
