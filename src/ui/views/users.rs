//! The user table: search, company filter, email sort, pagination.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use crate::store::cache::CacheEntry;
use crate::ui::theme::Theme;
use crate::users::types::User;

/// Direction of the email sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  #[default]
  Ascending,
  Descending,
}

impl SortOrder {
  pub fn toggled(self) -> Self {
    match self {
      SortOrder::Ascending => SortOrder::Descending,
      SortOrder::Descending => SortOrder::Ascending,
    }
  }

  fn label(self) -> &'static str {
    match self {
      SortOrder::Ascending => "email A-Z",
      SortOrder::Descending => "email Z-A",
    }
  }
}

/// Client-side view transform: name search, company filter, email sort.
/// Applied to the page slice after any optimistic changes.
pub fn visible_users(
  users: &[User],
  search: &str,
  company_filter: Option<&str>,
  sort: SortOrder,
) -> Vec<User> {
  let needle = search.trim().to_lowercase();
  let mut filtered: Vec<User> = users
    .iter()
    .filter(|u| needle.is_empty() || u.name.to_lowercase().contains(&needle))
    .filter(|u| company_filter.map_or(true, |c| u.company.name == c))
    .cloned()
    .collect();

  filtered.sort_by(|a, b| match sort {
    SortOrder::Ascending => a.email.cmp(&b.email),
    SortOrder::Descending => b.email.cmp(&a.email),
  });
  filtered
}

/// Distinct company names across the full list, for the filter cycle.
pub fn company_names(all_users: &[User]) -> Vec<String> {
  let mut names: Vec<String> = Vec::new();
  for user in all_users {
    if !names.contains(&user.company.name) {
      names.push(user.company.name.clone());
    }
  }
  names
}

#[allow(clippy::too_many_arguments)]
pub fn draw_user_table(
  frame: &mut Frame,
  area: Rect,
  entry: Option<&CacheEntry>,
  visible: &[User],
  selected: usize,
  page: u32,
  total: usize,
  search: &str,
  company_filter: Option<&str>,
  sort: SortOrder,
  theme: &Theme,
) {
  let loading = entry.map(|e| e.loading).unwrap_or(true);
  let error = entry.and_then(|e| e.error.clone());

  let mut title = format!(" Users — page {} ", page);
  if loading {
    title = format!(" Users — page {} (loading...) ", page);
  }

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(theme.border));

  if let Some(message) = error {
    let paragraph = Paragraph::new(format!("Failed to load users: {}", message))
      .block(block)
      .style(Style::default().fg(theme.danger));
    frame.render_widget(paragraph, area);
    return;
  }

  if visible.is_empty() && !loading {
    let content = if !search.is_empty() || company_filter.is_some() {
      "No users match. Try adjusting your search or filters."
    } else {
      "No users on this page."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(theme.dim));
    frame.render_widget(paragraph, area);
    return;
  }

  let header = Row::new(
    ["", "ID", "Name", "Email", "Phone", "Company"]
      .iter()
      .map(|h| Cell::from(*h)),
  )
  .style(Style::default().fg(theme.dim).add_modifier(Modifier::BOLD));

  let rows: Vec<Row> = visible
    .iter()
    .map(|user| {
      let id = if user.is_provisional() {
        "...".to_string()
      } else {
        user.id.to_string()
      };
      let row_style = if user.is_provisional() {
        Style::default().fg(theme.dim)
      } else {
        Style::default().fg(theme.fg)
      };
      Row::new(vec![
        Cell::from(Span::styled(user.initials(), Style::default().fg(theme.accent))),
        Cell::from(id),
        Cell::from(user.name.clone()),
        Cell::from(user.email.clone()),
        Cell::from(user.phone.clone()),
        Cell::from(user.company.name.clone()),
      ])
      .style(row_style)
    })
    .collect();

  let widths = [
    Constraint::Length(3),
    Constraint::Length(5),
    Constraint::Min(18),
    Constraint::Min(22),
    Constraint::Length(16),
    Constraint::Min(14),
  ];

  let footer = {
    let filter_label = company_filter.unwrap_or("all companies");
    format!(
      " showing {} of {} | {} | filter: {} | n/p:page a:add e:edit d:delete ",
      visible.len(),
      total,
      sort.label(),
      filter_label,
    )
  };

  let table = Table::new(rows, widths)
    .header(header)
    .block(block.title_bottom(Line::from(footer).style(Style::default().fg(theme.dim))))
    .row_highlight_style(
      Style::default()
        .bg(theme.highlight_bg)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = TableState::default();
  if !visible.is_empty() {
    state.select(Some(selected.min(visible.len() - 1)));
  }

  frame.render_stateful_widget(table, area, &mut state);
}
