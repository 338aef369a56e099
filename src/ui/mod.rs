//! Terminal UI
//!
//! Built with ratatui. Keyboard-first navigation throughout.

pub mod screen;
pub mod theme;

pub use screen::render;
pub use theme::Theme;
