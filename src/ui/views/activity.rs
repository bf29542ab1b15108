//! Activity log view: every recorded mutation intent, newest first.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::store::activity_log::ActivityLogEntry;
use crate::ui::theme::Theme;
use crate::users::types::UserAction;

pub fn draw_activity_log(
  frame: &mut Frame,
  area: Rect,
  entries: &[ActivityLogEntry],
  selected: usize,
  administrator: &str,
  theme: &Theme,
) {
  let block = Block::default()
    .title(format!(" Activity — {} ({}) ", administrator, entries.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(theme.border))
    .title_bottom(
      Line::from(" c:clear  q/Esc:back ").style(Style::default().fg(theme.dim)),
    );

  if entries.is_empty() {
    let paragraph = Paragraph::new("No activity recorded yet.")
      .block(block)
      .style(Style::default().fg(theme.dim));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = entries
    .iter()
    .map(|entry| {
      let action_color = match entry.action {
        UserAction::Create => theme.success,
        UserAction::Update => theme.warning,
        UserAction::Delete => theme.danger,
      };

      let line = Line::from(vec![
        Span::styled(
          entry.timestamp.format("%Y-%m-%d %H:%M:%S ").to_string(),
          Style::default().fg(theme.dim),
        ),
        Span::styled(
          format!("{:<7}", entry.action.label()),
          Style::default().fg(action_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(entry.subject.name().to_string(), Style::default().fg(theme.fg)),
        Span::styled(
          format!("  by {}", entry.administrator),
          Style::default().fg(theme.dim),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(Style::default().bg(theme.highlight_bg))
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected.min(entries.len() - 1)));

  frame.render_stateful_widget(list, area, &mut state);
}
