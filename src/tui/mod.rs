//! Terminal User Interface module
//!
//! Both variants side by side: templates, transcripts, action items and a
//! comparison of the latest replies.

mod app;
mod input;
mod shimmer;
mod theme;
mod widgets;

pub use app::App;
pub use input::{InputAction, InputState};
pub use theme::Theme;
