//! Delete confirmation overlay.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::ui::theme::Theme;
use crate::users::types::User;

/// Outcome of a key press in the confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
  Pending,
  Confirmed,
  Cancelled,
}

/// Confirmation state for a pending delete.
#[derive(Debug, Clone)]
pub struct DeleteConfirmation {
  pub user: User,
}

impl DeleteConfirmation {
  pub fn new(user: User) -> Self {
    Self { user }
  }

  pub fn handle_key(&self, key: KeyEvent) -> ConfirmResult {
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => ConfirmResult::Confirmed,
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => ConfirmResult::Cancelled,
      _ => ConfirmResult::Pending,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme, busy: bool) {
    let width = (area.width * 50 / 100).clamp(30, 50);
    let height = 6;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height.min(area.height));

    frame.render_widget(Clear, overlay);

    let block = Block::default()
      .title(" Delete User ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(theme.danger))
      .style(Style::default().bg(theme.bg));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let hint = if busy {
      Span::styled("deleting...", Style::default().fg(theme.warning))
    } else {
      Span::styled("y/Enter:delete  n/Esc:cancel", Style::default().fg(theme.dim))
    };

    let lines = vec![
      Line::from(vec![
        Span::styled("Delete ", Style::default().fg(theme.fg)),
        Span::styled(
          self.user.name.clone(),
          Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
        ),
        Span::styled("?", Style::default().fg(theme.fg)),
      ]),
      Line::from(Span::styled(
        "This cannot be undone.",
        Style::default().fg(theme.dim),
      )),
      Line::default(),
      Line::from(hint),
    ];

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::users::types::UserFormData;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn dialog() -> DeleteConfirmation {
    let user = UserFormData {
      name: "Ann Lee".to_string(),
      email: "ann@x.com".to_string(),
      phone: "555".to_string(),
      company: "Acme".to_string(),
    }
    .expand(7);
    DeleteConfirmation::new(user)
  }

  #[test]
  fn test_confirm_keys() {
    let d = dialog();
    assert_eq!(d.handle_key(key(KeyCode::Char('y'))), ConfirmResult::Confirmed);
    assert_eq!(d.handle_key(key(KeyCode::Enter)), ConfirmResult::Confirmed);
  }

  #[test]
  fn test_cancel_keys() {
    let d = dialog();
    assert_eq!(d.handle_key(key(KeyCode::Char('n'))), ConfirmResult::Cancelled);
    assert_eq!(d.handle_key(key(KeyCode::Esc)), ConfirmResult::Cancelled);
  }

  #[test]
  fn test_other_keys_stay_pending() {
    let d = dialog();
    assert_eq!(d.handle_key(key(KeyCode::Char('x'))), ConfirmResult::Pending);
  }
}
