pub mod input;
pub mod time;

pub use input::{Action, InputEvent, InputState};
pub use time::SimClock;
