//! Debate orchestration logic.
//!
//! Drives Opening → Rebuttal → Vote for one question, tallies the ballots,
//! hands decisive results to the outcome recorder, and builds the
//! transcripts. Personas are processed one at a time; a failure degrades
//! only the data point it affects.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::ballot::{ArgumentMap, Ballot, Verdict, VoteTally, parse_vote};
use crate::error::{DebateError, InferenceError};
use crate::history::HistoricalContext;
use crate::inference::{InferenceClient, non_empty, sanitize_response};
use crate::persona::{Persona, PersonaRegistry};
use crate::prompt;
use crate::recorder::OutcomeRecorder;
use crate::session::{CastVote, PersonaArguments, Statement};
use crate::transcript::{Transcript, TranscriptFiles, TranscriptSink};

/// Fewest personas that make a debate.
pub const MIN_PERSONAS: usize = 2;

/// Shown in place of a winner when the vote is not decisive.
pub const TIE: &str = "TIE";

/// Configuration for running a debate.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// The question being debated.
    pub question: String,
    /// Pause between consecutive personas within a phase.
    pub pacing: Duration,
}

impl DebateConfig {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            pacing: Duration::ZERO,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

/// Orchestrator states. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebatePhase {
    Init,
    Opening,
    Rebuttal,
    Voting,
    Tally,
    Persisted,
    Done,
}

impl DebatePhase {
    pub fn next(self) -> Self {
        match self {
            DebatePhase::Init => DebatePhase::Opening,
            DebatePhase::Opening => DebatePhase::Rebuttal,
            DebatePhase::Rebuttal => DebatePhase::Voting,
            DebatePhase::Voting => DebatePhase::Tally,
            DebatePhase::Tally => DebatePhase::Persisted,
            DebatePhase::Persisted | DebatePhase::Done => DebatePhase::Done,
        }
    }

    /// Transcript header for the phases that have one.
    pub fn title(self) -> Option<&'static str> {
        match self {
            DebatePhase::Opening => Some("Phase 1: Opening Statements"),
            DebatePhase::Rebuttal => Some("Phase 2: Rebuttals"),
            DebatePhase::Voting => Some("Phase 3: The Vote"),
            DebatePhase::Tally => Some("Final Results"),
            _ => None,
        }
    }
}

/// What happened to the debate record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Recorded { debate_id: i64 },
    /// Indecisive debates leave no history.
    SkippedTie,
    /// No recorder was attached.
    Disabled,
    Failed(String),
}

/// Callback for debate events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Events emitted during a debate.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    /// The panel has convened.
    DebateStart { question: String, personas: Vec<Persona> },
    /// A new phase is starting.
    PhaseStart { phase: DebatePhase, title: String },
    /// A persona is about to be asked.
    SpeakerStart { name: String, model: String, phase: DebatePhase },
    /// A persona delivered its opening or rebuttal.
    Statement { name: String, model: String, phase: DebatePhase, content: String },
    /// A persona's opening or rebuttal failed.
    StatementFailed { name: String, model: String, phase: DebatePhase, error: InferenceError },
    /// A ballot was cast (possibly spoiled).
    VoteCast { voter: String, model: String, raw: String, ballot: Ballot },
    /// The vote request failed; no ballot.
    VoteFailed { voter: String, model: String, error: InferenceError },
    /// The count is in.
    Verdict { verdict: Verdict, winner: Option<String> },
    /// Per-label counts as `(label, persona, votes)`, plus spoiled ballots.
    Tally { counts: Vec<(usize, String, usize)>, spoiled: usize },
    Persisted { debate_id: i64 },
    PersistenceSkipped,
    PersistenceFailed { error: String },
    TranscriptSaved { files: TranscriptFiles },
    TranscriptFailed { error: String },
    /// The debate has concluded.
    DebateEnd,
}

/// Everything a finished debate produced.
#[derive(Debug, Clone)]
pub struct DebateReport {
    pub question: String,
    pub arguments: Vec<PersonaArguments>,
    pub argument_map: ArgumentMap,
    pub votes: Vec<CastVote>,
    pub tally: VoteTally,
    pub verdict: Verdict,
    pub persistence: PersistenceStatus,
    pub transcript: Transcript,
    pub transcript_files: Option<TranscriptFiles>,
}

impl DebateReport {
    /// The winning persona, or `None` on a tie.
    pub fn winner(&self) -> Option<&str> {
        match self.verdict {
            Verdict::Winner { label } => self.argument_map.persona_for(label),
            Verdict::Tie => None,
        }
    }

    /// Winner name or `"TIE"`.
    pub fn winner_or_tie(&self) -> &str {
        self.winner().unwrap_or(TIE)
    }
}

/// Orchestrates a debate between AI personas.
pub struct DebateOrchestrator {
    config: DebateConfig,
    client: Arc<dyn InferenceClient>,
    history: Arc<dyn HistoricalContext>,
    recorder: Option<Arc<dyn OutcomeRecorder>>,
    sink: Option<Arc<dyn TranscriptSink>>,
    callback: Option<DebateCallback>,
    phase: DebatePhase,
    /// One entry per persona, in registry order.
    arguments: Vec<PersonaArguments>,
    transcript: Transcript,
}

impl DebateOrchestrator {
    /// Create an orchestrator over a snapshot of the registry.
    pub fn new(
        config: DebateConfig,
        personas: &PersonaRegistry,
        client: Arc<dyn InferenceClient>,
        history: Arc<dyn HistoricalContext>,
    ) -> Result<Self, DebateError> {
        if personas.len() < MIN_PERSONAS {
            return Err(DebateError::InvalidPersonaCount {
                min: MIN_PERSONAS,
                actual: personas.len(),
            });
        }

        let arguments = personas
            .iter()
            .cloned()
            .map(PersonaArguments::new)
            .collect();

        Ok(Self {
            config,
            client,
            history,
            recorder: None,
            sink: None,
            callback: None,
            phase: DebatePhase::Init,
            arguments,
            transcript: Transcript::new(),
        })
    }

    /// Record decisive results through this recorder.
    pub fn with_recorder(mut self, recorder: Arc<dyn OutcomeRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Hand the finished transcript to this sink.
    pub fn with_transcript_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn phase(&self) -> DebatePhase {
        self.phase
    }

    /// Run the full debate. An orchestrator runs once.
    pub async fn run(&mut self) -> Result<DebateReport, DebateError> {
        if self.phase != DebatePhase::Init {
            return Err(DebateError::AlreadyRun);
        }

        let question = self.config.question.clone();
        info!(question = %question, personas = self.arguments.len(), "debate starting");
        self.emit_event(DebateEvent::DebateStart {
            question: question.clone(),
            personas: self.arguments.iter().map(|a| a.persona.clone()).collect(),
        });
        self.transcript.line(
            "==============================================\n    \
             Persona Debate Panel Has Convened!     \n\
             ==============================================",
        );
        self.transcript
            .line(format!("\nTonight's question: {question}\n"));

        self.advance();
        self.run_openings().await;

        self.advance();
        self.run_rebuttals().await;

        self.advance();
        let (argument_map, votes) = self.run_votes().await;

        self.advance();
        let tally = VoteTally::from_ballots(&argument_map, votes.iter().map(|v| &v.ballot));
        let verdict = tally.verdict();
        self.announce_result(&argument_map, &tally, verdict);

        self.advance();
        let persistence = self.persist(&argument_map, verdict).await;

        let footer = "\n==============================\n      \
                      Debate Concluded.             \n\
                      ==============================";
        self.transcript.shared_line(footer);
        let transcript_files = self.save_transcript();

        self.advance();
        self.emit_event(DebateEvent::DebateEnd);

        Ok(DebateReport {
            question,
            arguments: self.arguments.clone(),
            argument_map,
            votes,
            tally,
            verdict,
            persistence,
            transcript: self.transcript.clone(),
            transcript_files,
        })
    }

    fn advance(&mut self) {
        self.phase = self.phase.next();
        if let Some(title) = self.phase.title() {
            match self.phase {
                DebatePhase::Voting | DebatePhase::Tally => self.transcript.shared_header(title),
                _ => self.transcript.header(title),
            }
            self.emit_event(DebateEvent::PhaseStart {
                phase: self.phase,
                title: title.to_string(),
            });
        }
    }

    async fn run_openings(&mut self) {
        let question = self.config.question.clone();
        let count = self.arguments.len();

        for idx in 0..count {
            let persona = self.arguments[idx].persona.clone();
            self.announce_speaker(&persona);

            let hint = self.history.query(&persona.name, &question).await;
            let prompt = prompt::opening_prompt(&persona, &hint, &question);
            let statement = self.ask(&persona, &prompt).await;

            self.transcript.statement(
                &format!("🎙️ {}", persona.display_name_with_model()),
                statement.transcript_text(),
            );
            self.arguments[idx].opening = Some(statement);
            self.pace(idx, count).await;
        }
    }

    async fn run_rebuttals(&mut self) {
        let question = self.config.question.clone();
        let openings = prompt::openings_block(&self.arguments);
        let count = self.arguments.len();

        for idx in 0..count {
            let persona = self.arguments[idx].persona.clone();
            self.announce_speaker(&persona);

            let prompt = prompt::rebuttal_prompt(&persona, &question, &openings);
            let statement = self.ask(&persona, &prompt).await;

            self.transcript.statement(
                &format!("🗣️ {}'s Rebuttal", persona.display_name_with_model()),
                statement.transcript_text(),
            );
            self.arguments[idx].rebuttal = Some(statement);
            self.pace(idx, count).await;
        }
    }

    async fn run_votes(&mut self) -> (ArgumentMap, Vec<CastVote>) {
        let argument_map = ArgumentMap::build(&self.arguments);
        let block = prompt::arguments_block(&argument_map);
        let count = self.arguments.len();
        let mut votes = Vec::new();

        for idx in 0..count {
            let persona = self.arguments[idx].persona.clone();
            let who = persona.display_name_with_model();
            let prompt = prompt::vote_prompt(&persona, &block);

            match self.client.generate(&persona.model, &prompt).await {
                Ok(raw) => {
                    self.transcript
                        .vote_line(format!("{who} raw vote response: {raw}"));
                    let ballot = parse_vote(&raw, &argument_map);
                    let line = match ballot {
                        Ballot::Label(label) => {
                            format!("🗳️ {who} votes for: Argument {label}")
                        }
                        Ballot::Spoiled => format!("🗳️ {who} spoiled its ballot."),
                    };
                    self.transcript.shared_line(line);
                    self.emit_event(DebateEvent::VoteCast {
                        voter: persona.name.clone(),
                        model: persona.model.clone(),
                        raw: raw.clone(),
                        ballot,
                    });
                    votes.push(CastVote {
                        voter: persona.name.clone(),
                        raw,
                        ballot,
                    });
                }
                Err(error) => {
                    warn!(persona = %persona.name, error = %error, "vote request failed");
                    self.transcript
                        .shared_line(format!("🗳️ {who} cast no ballot ({error})."));
                    self.emit_event(DebateEvent::VoteFailed {
                        voter: persona.name.clone(),
                        model: persona.model.clone(),
                        error,
                    });
                }
            }
            self.pace(idx, count).await;
        }

        (argument_map, votes)
    }

    fn announce_result(&mut self, map: &ArgumentMap, tally: &VoteTally, verdict: Verdict) {
        let winner = match verdict {
            Verdict::Winner { label } => map.persona_for(label).map(str::to_string),
            Verdict::Tie => None,
        };

        let line = match (&verdict, &winner) {
            (Verdict::Winner { label }, Some(name)) => {
                format!("🎉 The winner is: {name} (Argument {label})! 🎉")
            }
            _ if tally.spoiled_leads() => {
                "⚖️ The vote was spoiled or a TIE. No winner recorded. ⚖️".to_string()
            }
            _ => "⚖️ The vote resulted in a TIE. No winner recorded. ⚖️".to_string(),
        };
        info!(result = %line, ballots = tally.ballots(), "vote counted");
        self.transcript.shared_line(line);
        self.emit_event(DebateEvent::Verdict { verdict, winner });

        self.transcript.shared_line("\n--- Final Vote Tally ---");
        self.transcript
            .shared_line(format!("Spoiled Ballots: {} vote(s)", tally.spoiled()));
        let mut counts = Vec::new();
        for (label, votes) in tally.label_counts() {
            let persona = map.persona_for(label).unwrap_or("Unknown").to_string();
            self.transcript
                .shared_line(format!("Argument {label} ({persona}): {votes} vote(s)"));
            counts.push((label, persona, votes));
        }
        self.emit_event(DebateEvent::Tally {
            counts,
            spoiled: tally.spoiled(),
        });
    }

    async fn persist(&mut self, map: &ArgumentMap, verdict: Verdict) -> PersistenceStatus {
        let winner = match verdict {
            Verdict::Winner { label } => map.persona_for(label),
            Verdict::Tie => None,
        };

        let Some(winner) = winner else {
            self.transcript
                .shared_line("\n[No clear winner; debate will not be logged to history.]\n");
            self.emit_event(DebateEvent::PersistenceSkipped);
            return PersistenceStatus::SkippedTie;
        };

        let Some(recorder) = self.recorder.clone() else {
            return PersistenceStatus::Disabled;
        };

        match recorder
            .persist(&self.config.question, winner, &self.arguments)
            .await
        {
            Ok(debate_id) => {
                self.emit_event(DebateEvent::Persisted { debate_id });
                PersistenceStatus::Recorded { debate_id }
            }
            Err(e) => {
                let error = e.to_string();
                warn!(error = %error, "failed to record debate");
                self.transcript
                    .line(format!("\n[Failed to log debate to history: {error}]\n"));
                self.emit_event(DebateEvent::PersistenceFailed {
                    error: error.clone(),
                });
                PersistenceStatus::Failed(error)
            }
        }
    }

    fn save_transcript(&self) -> Option<TranscriptFiles> {
        let sink = self.sink.as_ref()?;
        match sink.write(&self.config.question, &self.transcript) {
            Ok(files) => {
                self.emit_event(DebateEvent::TranscriptSaved {
                    files: files.clone(),
                });
                Some(files)
            }
            Err(e) => {
                warn!(error = %e, "failed to save transcript");
                self.emit_event(DebateEvent::TranscriptFailed {
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn announce_speaker(&self, persona: &Persona) {
        self.emit_event(DebateEvent::SpeakerStart {
            name: persona.name.clone(),
            model: persona.model.clone(),
            phase: self.phase,
        });
    }

    /// One inference attempt for an opening or rebuttal. Reasoning blocks
    /// are stripped; a reply that was nothing but reasoning is empty.
    async fn ask(&self, persona: &Persona, prompt: &str) -> Statement {
        let result = self
            .client
            .generate(&persona.model, prompt)
            .await
            .and_then(|raw| non_empty(sanitize_response(&raw)));
        let statement = Statement::from_result(result);
        match &statement {
            Statement::Delivered(content) => self.emit_event(DebateEvent::Statement {
                name: persona.name.clone(),
                model: persona.model.clone(),
                phase: self.phase,
                content: content.clone(),
            }),
            Statement::Failed(error) => {
                warn!(persona = %persona.name, phase = ?self.phase, error = %error, "no response");
                self.emit_event(DebateEvent::StatementFailed {
                    name: persona.name.clone(),
                    model: persona.model.clone(),
                    phase: self.phase,
                    error: error.clone(),
                });
            }
        }
        statement
    }

    /// Pause between consecutive personas, not after the last.
    async fn pace(&self, idx: usize, count: usize) {
        if idx + 1 < count && !self.config.pacing.is_zero() {
            tokio::time::sleep(self.config.pacing).await;
        }
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    /// Get the transcript built so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}
