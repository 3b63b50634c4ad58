//! board.rs: in-memory slot holding the displayed news batch.
//!
//! Every refresh takes a ticket from a monotonic counter when it is issued. Only the
//! result carrying the latest ticket may write the slot; late results from older
//! refreshes are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::debug;

use crate::config::ai::Locale;
use crate::error::FetchError;
use crate::fetch::FallbackOrchestrator;
use crate::news::NewsItem;

/// Generation captured when a refresh is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoardState {
    #[default]
    Idle,
    Ready {
        items: Vec<NewsItem>,
        generation: u64,
        updated_at: DateTime<Utc>,
    },
    Failed {
        message: String,
        generation: u64,
    },
}

impl BoardState {
    pub fn generation(&self) -> u64 {
        match self {
            BoardState::Idle => 0,
            BoardState::Ready { generation, .. } | BoardState::Failed { generation, .. } => {
                *generation
            }
        }
    }

    pub fn items(&self) -> &[NewsItem] {
        match self {
            BoardState::Ready { items, .. } => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Default)]
pub struct NewsBoard {
    latest: AtomicU64,
    slot: RwLock<BoardState>,
    locale: Locale,
}

impl NewsBoard {
    pub fn new(locale: Locale) -> Self {
        Self {
            latest: AtomicU64::new(0),
            slot: RwLock::new(BoardState::Idle),
            locale,
        }
    }

    /// Issue a new ticket; it supersedes every earlier one.
    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Apply a finished refresh. Returns `false` (and leaves the slot alone) when a
    /// newer ticket has been issued since `ticket`.
    pub fn commit(&self, ticket: Ticket, outcome: Result<Vec<NewsItem>, FetchError>) -> bool {
        let mut slot = match self.slot.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Checked under the write lock so a newer commit can't be overwritten.
        if ticket.0 != self.latest.load(Ordering::SeqCst) {
            counter!("news_stale_results_total").increment(1);
            debug!(
                target: "techinvest",
                ticket = ticket.0,
                latest = self.latest.load(Ordering::SeqCst),
                "discarding stale refresh result"
            );
            return false;
        }
        *slot = match outcome {
            Ok(items) => BoardState::Ready {
                items,
                generation: ticket.0,
                updated_at: Utc::now(),
            },
            Err(e) => BoardState::Failed {
                message: e.user_message(self.locale).to_string(),
                generation: ticket.0,
            },
        };
        true
    }

    /// Full refresh cycle through `orch`.
    pub async fn refresh(&self, orch: &FallbackOrchestrator) -> bool {
        let ticket = self.begin();
        let outcome = orch.fetch_news().await;
        self.commit(ticket, outcome)
    }

    pub fn snapshot(&self) -> BoardState {
        match self.slot.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True while the latest issued ticket has not settled.
    pub fn in_flight(&self) -> bool {
        self.snapshot().generation() < self.latest.load(Ordering::SeqCst)
    }
}
