mod display;
mod network;
mod ribbon;
mod runloop;
mod sound;

pub use display::*;
pub use network::*;
pub use ribbon::*;
pub use runloop::*;
pub use sound::*;
