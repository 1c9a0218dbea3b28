//! Historical context: a persona's past record on similar questions.
//!
//! Only the win/loss signal reaches the prompt. The text of past arguments
//! is never returned.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embedding::Embedder;
use crate::error::DebateError;
use crate::store::DebateStore;

const CONTEXT_HEADER: &str = "--- RELEVANT HISTORICAL CONTEXT ---";
const CONTEXT_FOOTER: &str = "--- END CONTEXT ---";

/// Returned when history cannot be read.
pub const FALLBACK_HINT: &str = "Error reading vector history. Relying on base logic.";

/// Supplies a strategic hint for a persona before it argues.
#[async_trait]
pub trait HistoricalContext: Send + Sync {
    /// Never fails; retrieval errors degrade to [`FALLBACK_HINT`].
    async fn query(&self, persona: &str, question: &str) -> String;
}

/// Classification of past outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySignal {
    Mixed,
    Successful,
    Lost,
    NoHistory,
}

impl HistorySignal {
    pub fn from_counts(wins: usize, losses: usize) -> Self {
        match (wins > 0, losses > 0) {
            (true, true) => HistorySignal::Mixed,
            (true, false) => HistorySignal::Successful,
            (false, true) => HistorySignal::Lost,
            (false, false) => HistorySignal::NoHistory,
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            HistorySignal::Mixed => {
                "In the past, your arguments on this topic have had mixed results. Be persuasive."
            }
            HistorySignal::Successful => {
                "Your past arguments on this topic have been very successful. Keep it up."
            }
            HistorySignal::Lost => {
                "Your past arguments on this topic have lost. You must change your strategy to be more persuasive."
            }
            HistorySignal::NoHistory => "No relevant history found for this specific topic. Good luck.",
        }
    }

    /// The hint as placed in the opening prompt.
    pub fn hint(&self) -> String {
        match self {
            HistorySignal::NoHistory => format!("{}\n", self.summary()),
            _ => format!("{CONTEXT_HEADER}\n{}\n{CONTEXT_FOOTER}\n", self.summary()),
        }
    }
}

/// History backed by the debate store's vector index.
pub struct VectorHistory {
    embedder: Arc<dyn Embedder>,
    store: Arc<DebateStore>,
    results: usize,
}

impl VectorHistory {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<DebateStore>, results: usize) -> Self {
        Self {
            embedder,
            store,
            results,
        }
    }

    /// Win/loss signal for the nearest past arguments of `persona`.
    pub async fn signal(&self, persona: &str, question: &str) -> Result<HistorySignal, DebateError> {
        let embedding = self.embedder.embed_one(question).await?;
        let matches = self.store.nearest(persona, &embedding, self.results)?;
        let wins = matches.iter().filter(|m| m.is_winner).count();
        let losses = matches.len() - wins;
        debug!(persona, wins, losses, "historical context");
        Ok(HistorySignal::from_counts(wins, losses))
    }
}

#[async_trait]
impl HistoricalContext for VectorHistory {
    async fn query(&self, persona: &str, question: &str) -> String {
        match self.signal(persona, question).await {
            Ok(signal) => signal.hint(),
            Err(e) => {
                warn!(persona, error = %e, "history lookup failed");
                format!("{FALLBACK_HINT}\n")
            }
        }
    }
}

/// Provider for runs with history disabled.
pub struct NoHistory;

#[async_trait]
impl HistoricalContext for NoHistory {
    async fn query(&self, _persona: &str, _question: &str) -> String {
        HistorySignal::NoHistory.hint()
    }
}
