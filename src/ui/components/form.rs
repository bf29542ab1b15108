//! Modal create/edit form for user records.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::ui::theme::Theme;
use crate::users::types::{FieldError, User, UserFormData};

const FIELDS: [&str; 4] = ["name", "email", "phone", "company"];
const LABELS: [&str; 4] = ["Full Name", "Email Address", "Phone Number", "Company"];

/// Result of handling a key event in the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormResult {
  /// Key was handled, stay in the form
  Consumed,
  /// Enter pressed and all fields validated
  Submitted(UserFormData),
  /// Escape pressed, form dismissed
  Cancelled,
}

#[derive(Debug, Clone, Default)]
struct FieldInput {
  value: String,
  /// Cursor position in chars; converted to a byte index at each edit site
  /// so multibyte input never splits a codepoint.
  cursor: usize,
}

impl FieldInput {
  fn from_value(value: &str) -> Self {
    Self {
      value: value.to_string(),
      cursor: value.chars().count(),
    }
  }

  fn byte_index(&self) -> usize {
    self
      .value
      .char_indices()
      .nth(self.cursor)
      .map(|(i, _)| i)
      .unwrap_or(self.value.len())
  }

  fn char_len(&self) -> usize {
    self.value.chars().count()
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let at = self.byte_index();
          self.value.remove(at);
        }
      }
      KeyCode::Delete => {
        if self.cursor < self.char_len() {
          let at = self.byte_index();
          self.value.remove(at);
        }
      }
      KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
      KeyCode::Right => self.cursor = (self.cursor + 1).min(self.char_len()),
      KeyCode::Home => self.cursor = 0,
      KeyCode::End => self.cursor = self.char_len(),
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        let at = self.byte_index();
        self.value = self.value[at..].to_string();
        self.cursor = 0;
      }
      KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
        let at = self.byte_index();
        self.value.insert(at, c);
        self.cursor += 1;
      }
      _ => {}
    }
  }
}

/// State of the create/edit overlay.
#[derive(Debug, Clone)]
pub struct UserForm {
  /// Id of the record being edited; `None` means create
  editing: Option<i64>,
  fields: [FieldInput; 4],
  errors: [Option<String>; 4],
  focus: usize,
}

impl UserForm {
  /// Blank form for creating a user.
  pub fn create() -> Self {
    Self {
      editing: None,
      fields: Default::default(),
      errors: Default::default(),
      focus: 0,
    }
  }

  /// Form prefilled from an existing record.
  pub fn edit(user: &User) -> Self {
    Self {
      editing: Some(user.id),
      fields: [
        FieldInput::from_value(&user.name),
        FieldInput::from_value(&user.email),
        FieldInput::from_value(&user.phone),
        FieldInput::from_value(&user.company.name),
      ],
      errors: Default::default(),
      focus: 0,
    }
  }

  pub fn editing(&self) -> Option<i64> {
    self.editing
  }

  fn data(&self) -> UserFormData {
    UserFormData {
      name: self.fields[0].value.trim().to_string(),
      email: self.fields[1].value.trim().to_string(),
      phone: self.fields[2].value.trim().to_string(),
      company: self.fields[3].value.trim().to_string(),
    }
  }

  fn set_errors(&mut self, errors: &[FieldError]) {
    self.errors = Default::default();
    for error in errors {
      if let Some(idx) = FIELDS.iter().position(|f| *f == error.field) {
        self.errors[idx] = Some(error.message.clone());
      }
    }
  }

  /// Handle a key event. Submission runs validation; invalid input never
  /// leaves the form.
  pub fn handle_key(&mut self, key: KeyEvent) -> FormResult {
    match key.code {
      KeyCode::Esc => FormResult::Cancelled,
      KeyCode::Enter => {
        let data = self.data();
        match data.validate() {
          Ok(()) => FormResult::Submitted(data),
          Err(errors) => {
            self.set_errors(&errors);
            FormResult::Consumed
          }
        }
      }
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % FIELDS.len();
        FormResult::Consumed
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + FIELDS.len() - 1) % FIELDS.len();
        FormResult::Consumed
      }
      _ => {
        self.fields[self.focus].handle_key(key);
        // Stale validation message for the edited field is misleading
        self.errors[self.focus] = None;
        FormResult::Consumed
      }
    }
  }

  /// Draw the form as a centered overlay.
  pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme, busy: bool) {
    let width = (area.width * 60 / 100).clamp(36, 56);
    let height = 15;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height.min(area.height));

    frame.render_widget(Clear, overlay);

    let title = if self.editing.is_some() {
      " Edit User "
    } else {
      " New User "
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(theme.accent))
      .style(Style::default().bg(theme.bg));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let mut lines: Vec<Line> = Vec::new();
    for (idx, label) in LABELS.iter().enumerate() {
      let focused = idx == self.focus;
      let marker = if focused { "> " } else { "  " };
      let label_style = if focused {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.dim)
      };

      let mut value = self.fields[idx].value.clone();
      if focused && !busy {
        value.insert(self.fields[idx].byte_index(), '\u{2502}');
      }

      lines.push(Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("{:<14}", label), label_style),
        Span::styled(value, Style::default().fg(theme.fg)),
      ]));
      match &self.errors[idx] {
        Some(message) => lines.push(Line::from(Span::styled(
          format!("  {}", message),
          Style::default().fg(theme.danger),
        ))),
        None => lines.push(Line::default()),
      }
    }

    lines.push(Line::default());
    let hint = if busy {
      Span::styled("saving...", Style::default().fg(theme.warning))
    } else {
      Span::styled(
        "Tab:next field  Enter:save  Esc:cancel",
        Style::default().fg(theme.dim),
      )
    };
    lines.push(Line::from(hint));

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_text(form: &mut UserForm, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_fill_and_submit() {
    let mut form = UserForm::create();
    type_text(&mut form, "Ann Lee");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "ann@x.com");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "+1 555-0100");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "Acme");

    match form.handle_key(key(KeyCode::Enter)) {
      FormResult::Submitted(data) => {
        assert_eq!(data.name, "Ann Lee");
        assert_eq!(data.email, "ann@x.com");
        assert_eq!(data.company, "Acme");
      }
      other => panic!("expected submission, got {:?}", other),
    }
  }

  #[test]
  fn test_invalid_submit_sets_errors_and_stays() {
    let mut form = UserForm::create();
    type_text(&mut form, "A");

    let result = form.handle_key(key(KeyCode::Enter));
    assert_eq!(result, FormResult::Consumed);
    assert!(form.errors[0].is_some());
    assert!(form.errors[1].is_some());
  }

  #[test]
  fn test_editing_a_field_clears_its_error() {
    let mut form = UserForm::create();
    form.handle_key(key(KeyCode::Enter));
    assert!(form.errors[0].is_some());

    form.handle_key(key(KeyCode::Char('A')));
    assert!(form.errors[0].is_none());
    assert!(form.errors[1].is_some());
  }

  #[test]
  fn test_multibyte_names_edit_cleanly() {
    let mut form = UserForm::create();
    type_text(&mut form, "José Núñez");
    assert_eq!(form.fields[0].value, "José Núñez");

    form.handle_key(key(KeyCode::Backspace));
    assert_eq!(form.fields[0].value, "José Núñe");

    // Editing at the front with accented chars ahead of the cursor
    form.handle_key(key(KeyCode::Home));
    form.handle_key(key(KeyCode::Delete));
    form.handle_key(key(KeyCode::Char('X')));
    assert_eq!(form.fields[0].value, "Xosé Núñe");

    form.handle_key(key(KeyCode::Right));
    form.handle_key(key(KeyCode::Char('a')));
    assert_eq!(form.fields[0].value, "Xoasé Núñe");
  }

  #[test]
  fn test_edit_prefill_places_cursor_after_multibyte_value() {
    let user = UserFormData {
      name: "José".to_string(),
      email: "jose@x.com".to_string(),
      phone: "555".to_string(),
      company: "Acme".to_string(),
    }
    .expand(3);

    let mut form = UserForm::edit(&user);
    form.handle_key(key(KeyCode::Char('!')));
    assert_eq!(form.fields[0].value, "José!");
  }

  #[test]
  fn test_focus_cycles() {
    let mut form = UserForm::create();
    assert_eq!(form.focus, 0);
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focus, 1);
    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focus, 0);
    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focus, 3);
  }

  #[test]
  fn test_edit_prefills_from_record() {
    let user = UserFormData {
      name: "Ann Lee".to_string(),
      email: "ann@x.com".to_string(),
      phone: "555".to_string(),
      company: "Acme".to_string(),
    }
    .expand(7);

    let form = UserForm::edit(&user);
    assert_eq!(form.editing(), Some(7));
    assert_eq!(form.fields[0].value, "Ann Lee");
    assert_eq!(form.fields[3].value, "Acme");
  }

  #[test]
  fn test_escape_cancels() {
    let mut form = UserForm::create();
    assert_eq!(form.handle_key(key(KeyCode::Esc)), FormResult::Cancelled);
  }
}
