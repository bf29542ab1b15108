//! Light/dark color palettes.

use ratatui::style::Color;

/// Resolved palette for the active theme.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
  pub bg: Color,
  pub fg: Color,
  pub dim: Color,
  pub accent: Color,
  pub border: Color,
  pub highlight_bg: Color,
  pub success: Color,
  pub warning: Color,
  pub danger: Color,
}

impl Theme {
  pub fn dark() -> Self {
    Self {
      bg: Color::Reset,
      fg: Color::White,
      dim: Color::DarkGray,
      accent: Color::Cyan,
      border: Color::Blue,
      highlight_bg: Color::DarkGray,
      success: Color::Green,
      warning: Color::Yellow,
      danger: Color::Red,
    }
  }

  pub fn light() -> Self {
    Self {
      bg: Color::White,
      fg: Color::Black,
      dim: Color::Gray,
      accent: Color::Blue,
      border: Color::Blue,
      highlight_bg: Color::LightBlue,
      success: Color::Green,
      warning: Color::Magenta,
      danger: Color::Red,
    }
  }

  pub fn from_dark_mode(dark: bool) -> Self {
    if dark {
      Self::dark()
    } else {
      Self::light()
    }
  }
}
