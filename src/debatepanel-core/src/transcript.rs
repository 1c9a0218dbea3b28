//! Debate transcripts and where they are written.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DebateError;

const RULE: &str = "------------------------------";

/// The two line logs produced by a debate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Every phase, statement, ballot, and the result.
    pub full: Vec<String>,
    /// Only the vote phase and the result.
    pub votes: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase header, in the full log only.
    pub fn header(&mut self, title: &str) {
        self.full.push(section(title));
    }

    /// Phase header, in both logs.
    pub fn shared_header(&mut self, title: &str) {
        let line = section(title);
        self.full.push(line.clone());
        self.votes.push(line);
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.full.push(line.into());
    }

    pub fn vote_line(&mut self, line: impl Into<String>) {
        self.votes.push(line.into());
    }

    pub fn shared_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.full.push(line.clone());
        self.votes.push(line);
    }

    /// A speaker's statement followed by a rule.
    pub fn statement(&mut self, heading: &str, text: &str) {
        self.full.push(format!("{heading}:\n{text}\n{RULE}"));
    }
}

fn section(title: &str) -> String {
    format!("\n{title}\n{RULE}")
}

/// Which of the two logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptKind {
    Full,
    Votes,
}

/// Paths written by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFiles {
    pub full: PathBuf,
    pub votes: PathBuf,
}

/// Receives the finished transcript for storage.
pub trait TranscriptSink: Send + Sync {
    fn write(&self, question: &str, transcript: &Transcript) -> Result<TranscriptFiles, DebateError>;
}

/// Writes transcripts as text files under a directory.
///
/// Full logs go to `debate_<timestamp>_<slug>.txt`; vote logs to
/// `vote_transcripts/vote_transcript_<timestamp>_<slug>.txt`.
pub struct FileTranscriptSink {
    dir: PathBuf,
}

impl FileTranscriptSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn votes_dir(&self) -> PathBuf {
        self.dir.join("vote_transcripts")
    }

    fn dir_for(&self, kind: TranscriptKind) -> (PathBuf, &'static str) {
        match kind {
            TranscriptKind::Full => (self.dir.clone(), "debate_"),
            TranscriptKind::Votes => (self.votes_dir(), "vote_transcript_"),
        }
    }

    /// Saved transcripts of one kind, newest first.
    pub fn list(&self, kind: TranscriptKind) -> Result<Vec<PathBuf>, DebateError> {
        let (dir, prefix) = self.dir_for(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".txt"))
            })
            .collect();
        files.sort();
        files.reverse();
        Ok(files)
    }

    /// Contents of a saved transcript. Only the file name of `name` is used,
    /// so listed paths and bare names both work.
    pub fn read(&self, kind: TranscriptKind, name: &str) -> Result<String, DebateError> {
        let file = Path::new(name).file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a transcript file name: {name}"),
            )
        })?;
        let (dir, _) = self.dir_for(kind);
        Ok(fs::read_to_string(dir.join(file))?)
    }
}

impl TranscriptSink for FileTranscriptSink {
    fn write(&self, question: &str, transcript: &Transcript) -> Result<TranscriptFiles, DebateError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let slug = question_slug(question);

        let full = self.dir.join(format!("debate_{stamp}_{slug}.txt"));
        let votes = self.votes_dir().join(format!("vote_transcript_{stamp}_{slug}.txt"));

        write_lines(&full, &transcript.full)?;
        write_lines(&votes, &transcript.votes)?;

        Ok(TranscriptFiles { full, votes })
    }
}

fn write_lines(path: &Path, lines: &[String]) -> Result<(), DebateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, lines.join("\n"))?;
    Ok(())
}

/// First five words of the lower-cased question, punctuation removed.
pub fn question_slug(question: &str) -> String {
    let cleaned: String = question
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().take(5).collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_slug() {
        assert_eq!(
            question_slug("Should AI be regulated, like nuclear power?"),
            "should_ai_be_regulated_like"
        );
        assert_eq!(question_slug("Why?"), "why");
        assert_eq!(question_slug("!!!"), "");
    }

    #[test]
    fn test_headers_demarcate_phases() {
        let mut t = Transcript::new();
        t.header("Phase 1: Opening Statements");
        t.shared_header("Phase 3: The Vote");
        t.vote_line("raw");
        t.shared_line("ballot");

        assert_eq!(t.full.len(), 3);
        assert_eq!(t.votes.len(), 3);
        assert!(t.full[0].contains("Phase 1: Opening Statements"));
        assert!(t.votes[0].contains("Phase 3: The Vote"));
        assert_eq!(t.votes[1], "raw");
    }

    #[test]
    fn test_file_sink_writes_both_logs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileTranscriptSink::new(dir.path().join("transcripts"));

        let mut t = Transcript::new();
        t.shared_header("Final Results");
        t.line("full only");

        let files = sink.write("Is water wet?", &t).unwrap();
        let full = fs::read_to_string(&files.full).unwrap();
        let votes = fs::read_to_string(&files.votes).unwrap();
        assert!(full.contains("full only"));
        assert!(!votes.contains("full only"));
        assert!(files.full.to_string_lossy().ends_with("_is_water_wet.txt"));

        assert_eq!(sink.list(TranscriptKind::Full).unwrap(), vec![files.full]);
        assert_eq!(sink.list(TranscriptKind::Votes).unwrap(), vec![files.votes]);
    }

    #[test]
    fn test_read_by_listed_path_or_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileTranscriptSink::new(dir.path());

        let mut t = Transcript::new();
        t.shared_header("Phase 3: The Vote");
        t.vote_line("A (a) raw vote response: 1");
        let files = sink.write("Tea or coffee?", &t).unwrap();

        let by_path = sink
            .read(TranscriptKind::Votes, &files.votes.to_string_lossy())
            .unwrap();
        assert!(by_path.contains("raw vote response: 1"));

        let name = files.full.file_name().unwrap().to_str().unwrap();
        let by_name = sink.read(TranscriptKind::Full, name).unwrap();
        assert!(by_name.contains("Phase 3: The Vote"));

        assert!(sink.read(TranscriptKind::Full, "debate_missing.txt").is_err());
        assert!(sink.read(TranscriptKind::Full, "..").is_err());
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileTranscriptSink::new(dir.path().join("nope"));
        assert!(sink.list(TranscriptKind::Full).unwrap().is_empty());
    }
}
