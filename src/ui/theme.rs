//! Indigo theme for AlchemyWatch
//!
//! Color palette and style helpers for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Color palette
pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // CORE PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// Background: #111118
    pub const BACKGROUND: Color = Color::Rgb(0x11, 0x11, 0x18);

    /// Primary: #6366f1 (indigo)
    pub const PRIMARY: Color = Color::Rgb(0x63, 0x66, 0xf1);

    /// Accent: #a5b4fc (light indigo)
    pub const ACCENT: Color = Color::Rgb(0xa5, 0xb4, 0xfc);

    /// Text: #f4f4f5
    pub const TEXT: Color = Color::Rgb(0xf4, 0xf4, 0xf5);

    /// Dim: #71717a
    pub const DIM: Color = Color::Rgb(0x71, 0x71, 0x7a);

    /// Success: #22c55e
    pub const SUCCESS: Color = Color::Rgb(0x22, 0xc5, 0x5e);

    /// Error: #ef4444
    pub const ERROR: Color = Color::Rgb(0xef, 0x44, 0x44);

    /// Border color
    pub const BORDER: Color = Color::Rgb(0x3f, 0x3f, 0x46);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND)
    }

    /// Selected row in the focused list
    pub fn highlighted() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Selected row in an unfocused list
    pub fn selected() -> Style {
        Style::default().fg(Self::ACCENT).add_modifier(Modifier::BOLD)
    }

    pub fn dimmed() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::ERROR).add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS).add_modifier(Modifier::BOLD)
    }

    pub fn title() -> Style {
        Style::default().fg(Self::PRIMARY).add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    pub fn border_focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn loading() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn keybind() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BORDER)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTRAST CHECKS
// ═══════════════════════════════════════════════════════════════════════════

/// Relative luminance per WCAG 2.1
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn channel(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b)
}

/// Contrast ratio between two colors (1.0 - 21.0)
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let l1 = relative_luminance(fg.0, fg.1, fg.2);
    let l2 = relative_luminance(bg.0, bg.1, bg.2);
    let (hi, lo) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
    (hi + 0.05) / (lo + 0.05)
}

pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}
