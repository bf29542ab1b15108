use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::users::types::{User, UserAction};

/// Results of async data-layer tasks, delivered back to the event loop.
#[derive(Debug)]
pub enum DataEvent {
  /// A page fetch finished; the cache holds the outcome.
  PageLoaded { page: u32 },
  /// The full-list fetch finished; the cache holds the outcome.
  AllUsersLoaded,
  /// A detail lookup resolved.
  UserLoaded(Box<User>),
  /// A detail lookup failed (distinct not-found/error state, no retry).
  UserLoadFailed { id: i64, error: String },
  /// A mutation resolved one way or the other.
  MutationFinished {
    action: UserAction,
    result: Result<String, String>,
  },
}

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh
  Tick,
  /// Async data-layer result
  Data(DataEvent),
}

/// Event handler that produces events from terminal input, a tick timer,
/// and async tasks.
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let input_tx = tx.clone();
    tokio::spawn(async move {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          if let Ok(CrosstermEvent::Key(key)) = event::read() {
            if input_tx.send(Event::Key(key)).is_err() {
              break;
            }
          }
        } else if input_tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    Self { tx, rx }
  }

  /// Sender for async tasks to deliver data events
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
