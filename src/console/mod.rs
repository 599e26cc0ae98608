//! Terminal front end: a line renderer and a scripted scroll driver.

mod renderer;
mod scroll;

pub use renderer::ConsoleRenderer;
pub use scroll::{ScrollDriver, ScrollError};
