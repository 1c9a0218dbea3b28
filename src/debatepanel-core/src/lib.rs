//! Debate Panel Core Library
//!
//! Provides the debate orchestration engine (Opening → Rebuttal → Vote),
//! the tally and tie-break rules, and the historical context that feeds
//! past outcomes back into new debates.

pub mod ballot;
pub mod config;
pub mod embedding;
pub mod error;
pub mod history;
pub mod inference;
pub mod orchestrator;
pub mod persona;
pub mod prompt;
pub mod recorder;
pub mod session;
pub mod store;
pub mod transcript;

pub use ballot::{ArgumentMap, Ballot, Verdict, VoteTally, parse_vote};
pub use config::{Config, default_config};
pub use embedding::{Embedder, HashingEmbedder, OllamaEmbedder, build_embedder};
pub use error::{DebateError, InferenceError};
pub use history::{HistoricalContext, HistorySignal, NoHistory, VectorHistory};
pub use inference::{Backend, InferenceClient, ModelCatalog, OllamaClient, OpenAiClient};
pub use orchestrator::{
    DebateConfig, DebateEvent, DebateOrchestrator, DebatePhase, DebateReport, PersistenceStatus,
};
pub use persona::{Persona, PersonaRegistry};
pub use recorder::{OutcomeRecorder, StoreRecorder};
pub use session::{PersonaArguments, Statement};
pub use store::DebateStore;
pub use transcript::{FileTranscriptSink, Transcript, TranscriptKind, TranscriptSink};
