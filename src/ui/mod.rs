pub mod components;
pub mod theme;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Clear, Paragraph};

use crate::app::{App, Mode, Overlay, ViewState};
use crate::store::persist::StateStore;

/// Draw the whole UI: the current view, any modal overlay, then the status
/// bar.
pub fn draw<S: StateStore + 'static>(frame: &mut Frame, app: &App<S>) {
  let theme = app.theme();

  frame.render_widget(
    Block::default().style(Style::default().bg(theme.bg).fg(theme.fg)),
    frame.area(),
  );

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(1), Constraint::Length(1)])
    .split(frame.area());

  match app.current_view() {
    Some(ViewState::UserList { page, selected }) => {
      let entry = app.page_entry();
      let visible = app.visible_users();
      views::users::draw_user_table(
        frame,
        chunks[0],
        entry.as_ref(),
        &visible,
        *selected,
        *page,
        app.total_users(),
        app.search_filter(),
        app.company_filter(),
        app.sort(),
        theme,
      );
    }
    Some(ViewState::UserDetail { user_id, state }) => {
      views::user_detail::draw_user_detail(frame, chunks[0], *user_id, state, theme);
    }
    Some(ViewState::ActivityLog { selected }) => {
      let entries = app.log_entries();
      views::activity::draw_activity_log(
        frame,
        chunks[0],
        &entries,
        *selected,
        &app.administrator(),
        theme,
      );
    }
    None => {}
  }

  match app.overlay() {
    Some(Overlay::Form(form)) => form.render(frame, chunks[0], theme, app.pending_mutation()),
    Some(Overlay::Confirm(confirm)) => {
      confirm.render(frame, chunks[0], theme, app.pending_mutation())
    }
    None => {}
  }

  if *app.mode() == Mode::Command {
    draw_command_suggestions(frame, chunks[0], app);
  }

  draw_status_bar(frame, chunks[1], app);
}

/// Suggestion list anchored above the status bar while in command mode.
fn draw_command_suggestions<S: StateStore + 'static>(frame: &mut Frame, area: Rect, app: &App<S>) {
  let theme = app.theme();
  let suggestions = app.autocomplete_suggestions();
  if suggestions.is_empty() {
    return;
  }

  let height = suggestions.len().min(6) as u16;
  let width = area.width.min(44);
  let y = area.y + area.height.saturating_sub(height);
  let overlay = Rect::new(area.x, y, width, height);

  frame.render_widget(Clear, overlay);

  let lines: Vec<Line> = suggestions
    .iter()
    .take(height as usize)
    .enumerate()
    .map(|(idx, cmd)| {
      let style = if idx == app.selected_suggestion() {
        Style::default().fg(theme.bg).bg(theme.accent)
      } else {
        Style::default().fg(theme.fg).bg(theme.highlight_bg)
      };
      Line::from(Span::styled(
        format!(" {:<12} {:<28}", cmd.name, cmd.description),
        style,
      ))
    })
    .collect();

  frame.render_widget(Paragraph::new(lines), overlay);
}

fn draw_status_bar<S: StateStore + 'static>(frame: &mut Frame, area: Rect, app: &App<S>) {
  let theme = app.theme();

  let line = match app.mode() {
    Mode::Command => Line::from(Span::styled(
      format!(":{}", app.command_input()),
      Style::default().fg(theme.warning),
    )),
    Mode::Search => Line::from(Span::styled(
      format!("/{}", app.search_filter()),
      Style::default().fg(theme.accent),
    )),
    Mode::Normal => {
      if app.pending_mutation() {
        Line::from(Span::styled(
          " saving...",
          Style::default().fg(theme.warning),
        ))
      } else if let Some((message, is_error)) = app.status() {
        let color = if *is_error { theme.danger } else { theme.success };
        Line::from(Span::styled(format!(" {}", message), Style::default().fg(color)))
      } else {
        let mut spans = vec![Span::styled(
          " j/k:move  Enter:open  ::command  /:search",
          Style::default().fg(theme.dim),
        )];
        if !app.search_filter().is_empty() {
          spans.push(Span::styled(
            format!("  [search: {}]", app.search_filter()),
            Style::default().fg(theme.accent),
          ));
        }
        spans.push(Span::styled(
          format!("  as {}", app.principal()),
          Style::default().fg(theme.dim),
        ));
        Line::from(spans)
      }
    }
  };

  frame.render_widget(
    Paragraph::new(line).style(Style::default().bg(theme.highlight_bg)),
    area,
  );
}
