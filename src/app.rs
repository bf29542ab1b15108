use crate::commands::{self, Command};
use crate::config::Config;
use crate::event::{DataEvent, Event, EventHandler};
use crate::store::activity_log::ActivityLogStore;
use crate::store::cache::{CacheEntry, QueryKey};
use crate::store::persist::StateStore;
use crate::store::session::SessionStore;
use crate::store::user_store::UserStore;
use crate::ui;
use crate::ui::components::confirm::{ConfirmResult, DeleteConfirmation};
use crate::ui::components::form::{FormResult, UserForm};
use crate::ui::theme::Theme;
use crate::ui::views::user_detail::DetailState;
use crate::ui::views::users::{self, SortOrder};
use crate::users::repo::{seed_users, SimulatedRepo};
use crate::users::types::{User, UserAction, UserFormData};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
  Search,
}

/// Modal overlay above the current view
#[derive(Debug)]
pub enum Overlay {
  Form(UserForm),
  Confirm(DeleteConfirmation),
}

/// View state - table data lives in the cache, views keep only UI state
#[derive(Debug)]
pub enum ViewState {
  UserList {
    page: u32,
    selected: usize,
  },
  UserDetail {
    user_id: i64,
    state: DetailState,
  },
  ActivityLog {
    selected: usize,
  },
}

/// Main application state. The composition root: every store is constructed
/// here and shared by `Arc` — there are no ambient singletons.
pub struct App<S: StateStore> {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<ViewState>,

  mode: Mode,
  overlay: Option<Overlay>,

  /// Command input buffer (after pressing :)
  command_input: String,
  selected_suggestion: usize,

  /// Live name filter for the user table (after pressing /)
  search_filter: String,
  company_filter: Option<String>,
  sort: SortOrder,

  theme: Theme,

  /// Whether a mutation is in flight. Submission controls are disabled
  /// while set; this convention is the only serialization of mutations.
  pending_mutation: bool,
  status: Option<(String, bool)>,

  store: Arc<UserStore<SimulatedRepo, S>>,
  session: Arc<SessionStore<S>>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  should_quit: bool,
}

impl<S: StateStore + 'static> App<S> {
  pub fn new(config: &Config, state: Arc<S>) -> Self {
    let repo = Arc::new(SimulatedRepo::new(Duration::from_millis(config.latency_ms())));
    let log = ActivityLogStore::new(state.clone(), config.administrator());
    let store = Arc::new(UserStore::new(repo, log, config.page_size()));
    let session = Arc::new(SessionStore::new(state, seed_users()[0].clone()));
    let theme = Theme::from_dark_mode(session.dark_mode());

    let (tx, _rx) = mpsc::unbounded_channel();

    Self {
      view_stack: vec![ViewState::UserList { page: 1, selected: 0 }],
      mode: Mode::Normal,
      overlay: None,
      command_input: String::new(),
      selected_suggestion: 0,
      search_filter: String::new(),
      company_filter: None,
      sort: SortOrder::default(),
      theme,
      pending_mutation: false,
      status: None,
      store,
      session,
      event_tx: tx,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // Initial data load: the page slice and the full list
    self.spawn_load_page(1);
    self.spawn_load_all();

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {}
      Event::Data(data) => self.handle_data_event(data),
    }
  }

  // ==========================================================================
  // Key handling
  // ==========================================================================

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.overlay.is_some() {
      self.handle_overlay_key(key);
      return;
    }

    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
      Mode::Search => self.handle_search_mode_key(key),
    }
  }

  fn handle_overlay_key(&mut self, key: crossterm::event::KeyEvent) {
    match self.overlay.take() {
      Some(Overlay::Form(mut form)) => {
        if self.pending_mutation {
          // Submission is disabled while a mutation is in flight
          self.overlay = Some(Overlay::Form(form));
          return;
        }
        match form.handle_key(key) {
          FormResult::Submitted(data) => {
            match form.editing() {
              Some(id) => self.spawn_update(id, data),
              None => self.spawn_create(data),
            }
            self.overlay = Some(Overlay::Form(form));
          }
          FormResult::Cancelled => {}
          FormResult::Consumed => self.overlay = Some(Overlay::Form(form)),
        }
      }
      Some(Overlay::Confirm(confirm)) => match confirm.handle_key(key) {
        ConfirmResult::Confirmed => {
          if self.pending_mutation {
            self.overlay = Some(Overlay::Confirm(confirm));
          } else {
            self.spawn_delete(confirm.user.id);
          }
        }
        ConfirmResult::Cancelled => {}
        ConfirmResult::Pending => self.overlay = Some(Overlay::Confirm(confirm)),
      },
      None => {}
    }
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    self.status = None;

    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else if key.code == KeyCode::Char('q') {
          self.should_quit = true;
        }
      }

      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Enter => self.enter_selected(),

      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Char('/') => {
        if self.on_user_list() {
          self.mode = Mode::Search;
        }
      }

      KeyCode::Char('n') | KeyCode::Right => self.change_page(1),
      KeyCode::Char('p') | KeyCode::Left => self.change_page(-1),

      KeyCode::Char('a') => {
        if self.on_user_list() {
          self.overlay = Some(Overlay::Form(UserForm::create()));
        }
      }
      KeyCode::Char('e') => {
        if let Some(user) = self.selected_user() {
          if !user.is_provisional() {
            self.overlay = Some(Overlay::Form(UserForm::edit(&user)));
          }
        }
      }
      KeyCode::Char('d') => {
        if let Some(user) = self.selected_user() {
          if !user.is_provisional() {
            self.overlay = Some(Overlay::Confirm(DeleteConfirmation::new(user)));
          }
        }
      }

      KeyCode::Char('s') => {
        if self.on_user_list() {
          self.sort = self.sort.toggled();
        }
      }
      KeyCode::Char('f') => self.cycle_company_filter(),
      KeyCode::Char('r') => self.refresh(),

      KeyCode::Char('c') => {
        if matches!(self.view_stack.last(), Some(ViewState::ActivityLog { .. }))
          && !self.store.log().is_empty()
        {
          self.store.log().clear();
          self.set_status("Activity log cleared", false);
        }
      }

      // Act as the viewed user for the rest of the session
      KeyCode::Char('u') => {
        if let Some(ViewState::UserDetail {
          state: DetailState::Loaded(user),
          ..
        }) = self.view_stack.last()
        {
          let user = (**user).clone();
          let name = user.name.clone();
          self.session.set_current_user(user);
          self.set_status(&format!("Now acting as {}", name), false);
        }
      }

      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn handle_search_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.search_filter.clear();
      }
      KeyCode::Enter => {
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        self.search_filter.pop();
      }
      KeyCode::Char(c) => {
        self.search_filter.push(c);
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    let suggestions = commands::get_suggestions(&self.command_input);
    let cmd = if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name.to_string()
    } else {
      self.command_input.trim().to_lowercase()
    };

    match cmd.as_str() {
      "users" => {
        self.view_stack = vec![ViewState::UserList { page: 1, selected: 0 }];
        self.refresh();
      }
      "log" => {
        if !matches!(self.view_stack.last(), Some(ViewState::ActivityLog { .. })) {
          self.view_stack.push(ViewState::ActivityLog { selected: 0 });
        }
      }
      "theme" => {
        let dark = self.session.toggle_dark_mode();
        self.theme = Theme::from_dark_mode(dark);
      }
      "clear-logs" => {
        self.store.log().clear();
        self.set_status("Activity log cleared", false);
      }
      "quit" => {
        self.should_quit = true;
      }
      _ => {}
    }
    self.command_input.clear();
  }

  // ==========================================================================
  // Navigation
  // ==========================================================================

  fn on_user_list(&self) -> bool {
    matches!(self.view_stack.last(), Some(ViewState::UserList { .. }))
  }

  fn move_selection(&mut self, delta: i32) {
    let visible_len = if self.on_user_list() {
      self.visible_users().len()
    } else {
      0
    };

    if let Some(view) = self.view_stack.last_mut() {
      match view {
        ViewState::UserList { selected, .. } => {
          if visible_len > 0 {
            *selected = (*selected as i32 + delta).rem_euclid(visible_len as i32) as usize;
          }
        }
        ViewState::ActivityLog { selected } => {
          let len = self.store.log().len();
          if len > 0 {
            *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
          }
        }
        ViewState::UserDetail { .. } => {}
      }
    }
  }

  fn change_page(&mut self, delta: i32) {
    if self.pending_mutation {
      return;
    }
    let total = self.store.all_users().len() as u32;
    let page_size = self.store.page_size();
    let last_page = total.div_ceil(page_size).max(1);

    let mut moved_to = None;
    if let Some(ViewState::UserList { page, selected }) = self.view_stack.last_mut() {
      let next = (*page as i32 + delta).clamp(1, last_page as i32) as u32;
      if next != *page {
        *page = next;
        *selected = 0;
        moved_to = Some(next);
      }
    }
    // Cached pages are served as-is unless a mutation marked them stale.
    if let Some(next) = moved_to {
      if self.store.needs_fetch(&QueryKey::Page(next)) {
        self.spawn_load_page(next);
      }
    }
  }

  fn enter_selected(&mut self) {
    match self.view_stack.last() {
      Some(ViewState::UserList { .. }) => {
        if let Some(user) = self.selected_user() {
          if user.is_provisional() {
            return;
          }
          self.view_stack.push(ViewState::UserDetail {
            user_id: user.id,
            state: DetailState::Loading,
          });
          self.spawn_load_user(user.id);
        }
      }
      _ => {}
    }
  }

  fn cycle_company_filter(&mut self) {
    if !self.on_user_list() {
      return;
    }
    let companies = users::company_names(&self.store.all_users());
    self.company_filter = match &self.company_filter {
      None => companies.first().cloned(),
      Some(current) => {
        let idx = companies.iter().position(|c| c == current);
        match idx {
          Some(i) if i + 1 < companies.len() => Some(companies[i + 1].clone()),
          _ => None,
        }
      }
    };
  }

  fn refresh(&mut self) {
    self.store.invalidate(&QueryKey::AllUsers);
    if let Some(ViewState::UserList { page, .. }) = self.view_stack.last() {
      let page = *page;
      self.store.invalidate(&QueryKey::Page(page));
      self.spawn_load_page(page);
    }
    self.spawn_load_all();
  }

  // ==========================================================================
  // Async tasks
  // ==========================================================================

  fn spawn_load_page(&self, page: u32) {
    let store = self.store.clone();
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      let _ = store.load_page(page).await;
      let _ = tx.send(Event::Data(DataEvent::PageLoaded { page }));
    });
  }

  fn spawn_load_all(&self) {
    let store = self.store.clone();
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      let _ = store.load_all().await;
      let _ = tx.send(Event::Data(DataEvent::AllUsersLoaded));
    });
  }

  fn spawn_load_user(&self, id: i64) {
    let store = self.store.clone();
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      let event = match store.get_user(id).await {
        Ok(user) => DataEvent::UserLoaded(Box::new(user)),
        Err(e) => DataEvent::UserLoadFailed {
          id,
          error: e.to_string(),
        },
      };
      let _ = tx.send(Event::Data(event));
    });
  }

  fn spawn_create(&mut self, data: UserFormData) {
    let page = self.current_page();
    let store = self.store.clone();
    let tx = self.event_tx.clone();
    self.pending_mutation = true;
    tokio::spawn(async move {
      let result = match store.create_user(page, data).await {
        Ok(user) => Ok(format!("Created {}", user.name)),
        Err(e) => Err(e.to_string()),
      };
      let _ = tx.send(Event::Data(DataEvent::MutationFinished {
        action: UserAction::Create,
        result,
      }));
    });
  }

  fn spawn_update(&mut self, id: i64, data: UserFormData) {
    let page = self.current_page();
    let store = self.store.clone();
    let tx = self.event_tx.clone();
    self.pending_mutation = true;
    tokio::spawn(async move {
      let result = match store.update_user(page, id, data).await {
        Ok(user) => Ok(format!("Updated {}", user.name)),
        Err(e) => Err(e.to_string()),
      };
      let _ = tx.send(Event::Data(DataEvent::MutationFinished {
        action: UserAction::Update,
        result,
      }));
    });
  }

  fn spawn_delete(&mut self, id: i64) {
    let page = self.current_page();
    let store = self.store.clone();
    let tx = self.event_tx.clone();
    self.pending_mutation = true;
    tokio::spawn(async move {
      let result = match store.delete_user(page, id).await {
        Ok(()) => Ok(format!("Deleted user {}", id)),
        Err(e) => Err(e.to_string()),
      };
      let _ = tx.send(Event::Data(DataEvent::MutationFinished {
        action: UserAction::Delete,
        result,
      }));
    });
  }

  // ==========================================================================
  // Data events
  // ==========================================================================

  fn handle_data_event(&mut self, event: DataEvent) {
    match event {
      DataEvent::PageLoaded { .. } | DataEvent::AllUsersLoaded => {
        self.clamp_selection();
      }
      DataEvent::UserLoaded(user) => {
        if let Some(ViewState::UserDetail { user_id, state }) = self.view_stack.last_mut() {
          if *user_id == user.id {
            *state = DetailState::Loaded(user);
          }
        }
      }
      DataEvent::UserLoadFailed { id, error } => {
        if let Some(ViewState::UserDetail { user_id, state }) = self.view_stack.last_mut() {
          if *user_id == id {
            *state = DetailState::Failed { error };
          }
        }
      }
      DataEvent::MutationFinished { action, result } => {
        self.pending_mutation = false;
        match result {
          Ok(message) => {
            // The form closes only once the mutation has been confirmed
            if matches!(self.overlay, Some(Overlay::Form(_))) {
              self.overlay = None;
            }
            self.set_status(&message, false);
          }
          Err(error) => {
            self.set_status(&format!("{} failed: {}", action.label(), error), true);
          }
        }
        self.clamp_selection();
      }
    }
  }

  fn clamp_selection(&mut self) {
    let visible_len = if self.on_user_list() {
      self.visible_users().len()
    } else {
      return;
    };
    if let Some(ViewState::UserList { selected, .. }) = self.view_stack.last_mut() {
      if visible_len == 0 {
        *selected = 0;
      } else {
        *selected = (*selected).min(visible_len - 1);
      }
    }
  }

  fn set_status(&mut self, message: &str, is_error: bool) {
    self.status = Some((message.to_string(), is_error));
  }

  // ==========================================================================
  // Accessors for UI rendering
  // ==========================================================================

  pub fn current_view(&self) -> Option<&ViewState> {
    self.view_stack.last()
  }

  pub fn current_page(&self) -> u32 {
    match self.view_stack.first() {
      Some(ViewState::UserList { page, .. }) => *page,
      _ => 1,
    }
  }

  pub fn page_entry(&self) -> Option<CacheEntry> {
    self.store.entry(&QueryKey::Page(self.current_page()))
  }

  /// The page slice after search/filter/sort, as rendered.
  pub fn visible_users(&self) -> Vec<User> {
    users::visible_users(
      &self.store.page_users(self.current_page()),
      &self.search_filter,
      self.company_filter.as_deref(),
      self.sort,
    )
  }

  pub fn total_users(&self) -> usize {
    self.store.all_users().len()
  }

  pub fn selected_user(&self) -> Option<User> {
    if let Some(ViewState::UserList { selected, .. }) = self.view_stack.last() {
      self.visible_users().get(*selected).cloned()
    } else {
      None
    }
  }

  pub fn log_entries(&self) -> Vec<crate::store::activity_log::ActivityLogEntry> {
    self.store.log().entries()
  }

  pub fn administrator(&self) -> String {
    self.store.log().administrator().to_string()
  }

  /// Display name of the session principal.
  pub fn principal(&self) -> String {
    self.session.current_user().name
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn overlay(&self) -> Option<&Overlay> {
    self.overlay.as_ref()
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn search_filter(&self) -> &str {
    &self.search_filter
  }

  pub fn company_filter(&self) -> Option<&str> {
    self.company_filter.as_deref()
  }

  pub fn sort(&self) -> SortOrder {
    self.sort
  }

  pub fn theme(&self) -> &Theme {
    &self.theme
  }

  pub fn pending_mutation(&self) -> bool {
    self.pending_mutation
  }

  pub fn status(&self) -> Option<&(String, bool)> {
    self.status.as_ref()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}
