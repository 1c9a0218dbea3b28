//! Debate Panel CLI
//!
//! Runs debates between AI personas, manages the panel, and browses past
//! results.

use clap::{Parser, Subcommand};
use colored::Colorize;
use debatepanel_core::config::Provider;
use debatepanel_core::store::DebateStore;
use debatepanel_core::{
    Backend, Ballot, Config, DebateConfig, DebateEvent, DebateOrchestrator, DebatePhase,
    FileTranscriptSink, HistoricalContext, ModelCatalog, NoHistory, Persona, StoreRecorder,
    TranscriptKind, VectorHistory, Verdict, build_embedder,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "debatepanel",
    version,
    about = "Persona Debate Panel - AI personas debate, rebut, and vote",
    long_about = "Runs a three-phase debate (opening, rebuttal, vote) between AI personas, \
                  each backed by its own model, and remembers who won."
)]
struct Cli {
    /// Configuration file (created on first persona edit)
    #[arg(long, global = true, default_value = "debatepanel.toml", value_name = "PATH")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a debate on a question
    Run {
        /// The question to debate
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Do not consult past debates for hints
        #[arg(long)]
        no_history: bool,

        /// Do not record the result in the history store
        #[arg(long)]
        no_record: bool,
    },

    /// Manage the personas on the panel
    #[command(subcommand)]
    Personas(PersonaCommand),

    /// List models available from the backend
    Models,

    /// Show recorded debates
    History {
        /// Number of debates to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Show the recorded arguments of one debate
        #[arg(long, value_name = "ID")]
        show: Option<i64>,
    },

    /// List saved transcripts, newest first
    Transcripts {
        /// List vote-only transcripts instead of full ones
        #[arg(long)]
        votes: bool,

        /// Print one transcript instead of listing them
        #[arg(long, value_name = "FILE")]
        show: Option<String>,
    },
}

#[derive(Subcommand)]
enum PersonaCommand {
    /// List personas in speaking order
    List,
    /// Add a persona at the end of the speaking order
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        model: String,
        #[arg(long, default_value = "You are a helpful AI assistant.")]
        description: String,
    },
    /// Remove a persona
    Remove {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Change a persona's model, description, or name
    Edit {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_name = "NEW_NAME")]
        rename: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config)?;
    apply_env(&mut config);

    match cli.command {
        Command::Run {
            question,
            no_history,
            no_record,
        } => run_debate(&config, question, no_history, no_record).await?,
        Command::Personas(cmd) => manage_personas(&cli.config, config, cmd)?,
        Command::Models => list_models(&config).await?,
        Command::History { limit, show } => show_history(&config, limit, show)?,
        Command::Transcripts { votes, show } => list_transcripts(&config, votes, show)?,
    }

    Ok(())
}

/// OpenAI-compatible backends take their base URL from the environment.
fn apply_env(config: &mut Config) {
    if config.backend.provider == Provider::OpenAI {
        if let Ok(base) = env::var("OPENAI_API_BASE").or_else(|_| env::var("OPENAI_BASE_URL")) {
            config.backend.api_base = base;
        }
    }
}

fn api_key(config: &Config) -> String {
    if config.backend.provider != Provider::OpenAI {
        return String::new();
    }
    env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    })
}

async fn run_debate(
    config: &Config,
    question: String,
    no_history: bool,
    no_record: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = config.registry()?;
    let backend = Backend::connect(&config.backend, &api_key(config))?;

    // Built once and shared by the history provider and the recorder.
    let embedder = build_embedder(&config.embedding, &config.backend)?;
    let store = Arc::new(DebateStore::open_at(config.storage.db_path())?);

    let history: Arc<dyn HistoricalContext> = if no_history {
        Arc::new(NoHistory)
    } else {
        Arc::new(VectorHistory::new(
            embedder.clone(),
            store.clone(),
            config.debate.history_results,
        ))
    };

    let debate_config = DebateConfig::new(&question).with_pacing(config.debate.pacing());
    let mut orchestrator = DebateOrchestrator::new(debate_config, &registry, backend, history)?
        .with_transcript_sink(Arc::new(FileTranscriptSink::new(
            config.storage.transcript_dir(),
        )))
        .with_callback(create_console_callback());
    if !no_record {
        orchestrator = orchestrator.with_recorder(Arc::new(StoreRecorder::new(embedder, store)));
    }

    let report = orchestrator.run().await?;

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  Debate concluded. Winner: {}", report.winner_or_tie())
            .bright_green()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    Ok(())
}

fn manage_personas(
    path: &Path,
    mut config: Config,
    cmd: PersonaCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = config.registry()?;

    match cmd {
        PersonaCommand::List => {
            if registry.is_empty() {
                println!("No personas configured yet. Add one with `personas add`.");
            }
            for (i, p) in registry.iter().enumerate() {
                println!(
                    "  {}. {} - using {}",
                    i + 1,
                    p.name.bright_cyan(),
                    p.model.dimmed()
                );
                println!("     {}", p.stance().dimmed());
            }
            return Ok(());
        }
        PersonaCommand::Add {
            name,
            model,
            description,
        } => {
            registry.add(Persona::new(&name, model, description))?;
            println!("{}", format!("Persona '{}' added.", name).green());
        }
        PersonaCommand::Remove { name } => {
            registry.remove(&name)?;
            println!("{}", format!("Persona '{}' removed.", name).yellow());
        }
        PersonaCommand::Edit {
            name,
            model,
            description,
            rename,
        } => {
            registry.update(&name, model, description)?;
            let saved_as = match rename {
                Some(new_name) => {
                    registry.rename(&name, &new_name)?;
                    new_name
                }
                None => name,
            };
            println!("{}", format!("Persona '{}' saved.", saved_as).green());
        }
    }

    config.set_registry(registry);
    config.save(path)?;
    Ok(())
}

async fn list_models(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = Backend::connect(&config.backend, &api_key(config))?;
    let models = backend.list_models().await.map_err(|e| {
        format!(
            "Could not fetch models from {}: {}",
            config.backend.api_base, e
        )
    })?;

    if models.is_empty() {
        println!("No models reported by {}.", config.backend.api_base);
    }
    for model in models {
        println!("  {}", model);
    }
    Ok(())
}

fn show_history(
    config: &Config,
    limit: usize,
    show: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = DebateStore::open_at(config.storage.db_path())?;

    if let Some(id) = show {
        let debate = store
            .debate(id)?
            .ok_or_else(|| format!("No recorded debate with id {}", id))?;
        println!("{} {}", "Question:".bold(), debate.question.bright_white());
        println!(
            "{} {}",
            "Winner:".bold(),
            debate.winning_persona.as_deref().unwrap_or("-").bright_green()
        );
        println!();
        for arg in store.arguments_for(id)? {
            println!(
                "{} {}",
                "▶".bright_cyan(),
                format!("{} ({}) {}", arg.persona, arg.model, arg.phase).bright_cyan()
            );
            for line in textwrap(&arg.text, 66).lines() {
                println!("  {}", line);
            }
            println!();
        }
        return Ok(());
    }

    let debates = store.recent_debates(limit)?;
    if debates.is_empty() {
        println!("No debates recorded yet.");
    }
    for d in debates {
        println!(
            "  #{} {} {} {}",
            d.debate_id,
            d.timestamp.dimmed(),
            d.winning_persona.as_deref().unwrap_or("-").bright_green(),
            d.question
        );
    }
    Ok(())
}

fn list_transcripts(
    config: &Config,
    votes: bool,
    show: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = FileTranscriptSink::new(config.storage.transcript_dir());
    let kind = if votes {
        TranscriptKind::Votes
    } else {
        TranscriptKind::Full
    };

    if let Some(name) = show {
        println!("{}", sink.read(kind, &name)?);
        return Ok(());
    }

    let files = sink.list(kind)?;
    if files.is_empty() {
        println!("No transcripts found.");
    }
    for file in files {
        println!("  {}", file.display());
    }
    Ok(())
}

/// Create a callback that prints debate events to the console.
fn create_console_callback() -> Box<dyn Fn(DebateEvent) + Send + Sync> {
    Box::new(move |event| match event {
        DebateEvent::DebateStart { question, personas } => {
            println!();
            println!("{}", "═".repeat(70).bright_blue());
            println!(
                "{}",
                "  🎙️ Persona Panel Has Convened!".bright_blue().bold()
            );
            println!("{}", "═".repeat(70).bright_blue());
            println!();
            println!("{} {}", "Tonight's question:".bold(), question.bright_white());
            println!();
            println!("{}", "Panelists:".bold());
            for (i, p) in personas.iter().enumerate() {
                println!(
                    "  {}. {} - using {}",
                    i + 1,
                    p.name.bright_cyan(),
                    p.model.dimmed()
                );
            }
        }
        DebateEvent::PhaseStart { title, .. } => {
            println!();
            println!("{}", "═".repeat(70).bright_magenta());
            println!("{}", format!("  📢 {}", title).bright_magenta().bold());
            println!("{}", "═".repeat(70).bright_magenta());
            println!();
        }
        DebateEvent::SpeakerStart { name, model, phase } => {
            let label = match phase {
                DebatePhase::Rebuttal => "rebuttal",
                _ => "opening",
            };
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                name.bright_cyan().bold(),
                format!("({}, {})", model, label).yellow()
            );
        }
        DebateEvent::Statement { content, .. } => {
            for line in textwrap(&content, 66).lines() {
                println!("  {}", line);
            }
            println!();
        }
        DebateEvent::StatementFailed { error, .. } => {
            println!("  {}", format!("Error: no response ({})", error).red());
            println!();
        }
        DebateEvent::VoteCast { voter, ballot, .. } => match ballot {
            Ballot::Label(label) => println!(
                "  🗳️ {} votes for {}",
                voter.bright_cyan(),
                format!("Argument {}", label).bold()
            ),
            Ballot::Spoiled => {
                println!("  🗳️ {} {}", voter.bright_cyan(), "spoiled its ballot.".yellow())
            }
        },
        DebateEvent::VoteFailed { voter, error, .. } => {
            println!(
                "  🗳️ {} {}",
                voter.bright_cyan(),
                format!("cast no ballot ({})", error).red()
            );
        }
        DebateEvent::Verdict { verdict, winner } => {
            println!();
            match (verdict, winner) {
                (Verdict::Winner { label }, Some(name)) => println!(
                    "{}",
                    format!("  🎉 The winner is: {} (Argument {})! 🎉", name, label)
                        .bright_green()
                        .bold()
                ),
                _ => println!(
                    "{}",
                    "  ⚖️ The vote resulted in a TIE. No winner recorded. ⚖️"
                        .yellow()
                        .bold()
                ),
            }
        }
        DebateEvent::Tally { counts, spoiled } => {
            println!();
            println!("{}", "  Final Vote Tally".bold());
            for (label, persona, votes) in counts {
                println!("    Argument {} ({}): {} vote(s)", label, persona, votes);
            }
            println!("    Spoiled Ballots: {} vote(s)", spoiled);
        }
        DebateEvent::Persisted { debate_id } => {
            println!(
                "{}",
                format!("  Debate #{} logged to history.", debate_id).dimmed()
            );
        }
        DebateEvent::PersistenceSkipped => {
            println!(
                "{}",
                "  No clear winner; debate will not be logged to history.".yellow()
            );
        }
        DebateEvent::PersistenceFailed { error } => {
            println!("{}", format!("  Error logging debate: {}", error).red());
        }
        DebateEvent::TranscriptSaved { files } => {
            println!(
                "{}",
                format!("  Transcript saved to {}", files.full.display()).dimmed()
            );
            println!(
                "{}",
                format!("  Vote transcript saved to {}", files.votes.display()).dimmed()
            );
        }
        DebateEvent::TranscriptFailed { error } => {
            println!("{}", format!("  Error saving transcript: {}", error).red());
        }
        DebateEvent::DebateEnd => {
            // Handled in main
        }
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        if current_line_len + word.len() + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word.len();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textwrap_breaks_on_width() {
        let wrapped = textwrap("one two three four", 9);
        assert_eq!(wrapped, "one two\nthree\nfour");
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["debatepanel", "run", "Is water wet?", "--no-history"]).unwrap();
        match cli.command {
            Command::Run {
                question,
                no_history,
                no_record,
            } => {
                assert_eq!(question, "Is water wet?");
                assert!(no_history);
                assert!(!no_record);
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.config, PathBuf::from("debatepanel.toml"));
    }

    #[test]
    fn test_cli_parses_persona_edit() {
        let cli = Cli::try_parse_from([
            "debatepanel",
            "--config",
            "panel.toml",
            "personas",
            "edit",
            "Libertarian",
            "--rename",
            "Classical Liberal",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Personas(PersonaCommand::Edit { rename: Some(ref n), .. }) if n == "Classical Liberal"
        ));
    }

    #[test]
    fn test_cli_parses_transcript_show() {
        let cli = Cli::try_parse_from([
            "debatepanel",
            "transcripts",
            "--votes",
            "--show",
            "vote_transcript_20250101_120000_tea.txt",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Transcripts { votes: true, show: Some(ref f) }
                if f == "vote_transcript_20250101_120000_tea.txt"
        ));
    }
}
