//! Full-record detail view for a single user.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::ui::theme::Theme;
use crate::users::types::User;

/// Detail view state: the lookup is uncached and resolves asynchronously.
#[derive(Debug)]
pub enum DetailState {
  Loading,
  Loaded(Box<User>),
  /// Lookup failed — not-found gets its own message, no retry.
  Failed { error: String },
}

pub fn draw_user_detail(
  frame: &mut Frame,
  area: Rect,
  user_id: i64,
  state: &DetailState,
  theme: &Theme,
) {
  let block = Block::default()
    .title(format!(" User {} ", user_id))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(theme.border));

  match state {
    DetailState::Loading => {
      let paragraph = Paragraph::new("loading...")
        .block(block)
        .style(Style::default().fg(theme.dim));
      frame.render_widget(paragraph, area);
    }
    DetailState::Failed { error } => {
      let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
          "User not available",
          Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(error.clone(), Style::default().fg(theme.dim))),
        Line::default(),
        Line::from(Span::styled("q/Esc:back", Style::default().fg(theme.dim))),
      ])
      .block(block);
      frame.render_widget(paragraph, area);
    }
    DetailState::Loaded(user) => {
      let label = |text: &str| Span::styled(format!("{:<12}", text), Style::default().fg(theme.dim));
      let value = |text: &str| Span::styled(text.to_string(), Style::default().fg(theme.fg));

      let mut lines = vec![
        Line::from(vec![
          Span::styled(
            format!(" {} ", user.initials()),
            Style::default().fg(theme.bg).bg(theme.accent),
          ),
          Span::raw(" "),
          Span::styled(
            user.name.clone(),
            Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
          ),
          Span::styled(format!("  @{}", user.username), Style::default().fg(theme.dim)),
        ]),
        Line::default(),
        Line::from(vec![label("Email"), value(&user.email)]),
        Line::from(vec![label("Phone"), value(&user.phone)]),
        Line::from(vec![label("Website"), value(&user.website)]),
        Line::default(),
        Line::from(Span::styled(
          "Address",
          Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
          label("Street"),
          value(&format!("{} {}", user.address.street, user.address.suite)),
        ]),
        Line::from(vec![
          label("City"),
          value(&format!("{} {}", user.address.city, user.address.zipcode)),
        ]),
        Line::from(vec![
          label("Geo"),
          value(&format!("{}, {}", user.address.geo.lat, user.address.geo.lng)),
        ]),
        Line::default(),
        Line::from(Span::styled(
          "Company",
          Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![label("Name"), value(&user.company.name)]),
      ];
      if !user.company.catch_phrase.is_empty() {
        lines.push(Line::from(vec![
          label("Motto"),
          Span::styled(
            user.company.catch_phrase.clone(),
            Style::default().fg(theme.fg).add_modifier(Modifier::ITALIC),
          ),
        ]));
      }
      lines.push(Line::default());
      lines.push(Line::from(Span::styled(
        "u:act as  q/Esc:back",
        Style::default().fg(theme.dim),
      )));

      let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
      frame.render_widget(paragraph, area);
    }
  }
}
