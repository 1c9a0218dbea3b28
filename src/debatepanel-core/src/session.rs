//! Per-debate state: what each persona said and how it voted.

use crate::ballot::Ballot;
use crate::error::InferenceError;
use crate::persona::Persona;
use crate::prompt::FAILURE_MARKER;

/// Outcome of asking a persona for one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Delivered(String),
    /// The model failed; kept so later phases and the transcript see a marker.
    Failed(InferenceError),
}

impl Statement {
    pub fn from_result(result: Result<String, InferenceError>) -> Self {
        match result {
            Ok(text) => Statement::Delivered(text),
            Err(err) => Statement::Failed(err),
        }
    }

    /// The delivered text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Statement::Delivered(text) => Some(text),
            Statement::Failed(_) => None,
        }
    }

    /// What the transcript and other personas see for this statement.
    pub fn transcript_text(&self) -> &str {
        self.text().unwrap_or(FAILURE_MARKER)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Statement::Delivered(_))
    }
}

/// A persona's opening and rebuttal. `None` means the phase has not run yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaArguments {
    pub persona: Persona,
    pub opening: Option<Statement>,
    pub rebuttal: Option<Statement>,
}

impl PersonaArguments {
    pub fn new(persona: Persona) -> Self {
        Self {
            persona,
            opening: None,
            rebuttal: None,
        }
    }

    pub fn delivered_opening(&self) -> Option<&str> {
        self.opening.as_ref().and_then(Statement::text)
    }

    pub fn delivered_rebuttal(&self) -> Option<&str> {
        self.rebuttal.as_ref().and_then(Statement::text)
    }

    /// Rebuttal if delivered, else opening if delivered.
    pub fn best_argument(&self) -> Option<&str> {
        self.delivered_rebuttal().or_else(|| self.delivered_opening())
    }
}

/// A ballot cast by one persona, with the raw response it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastVote {
    pub voter: String,
    pub raw: String,
    pub ballot: Ballot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_argument_prefers_rebuttal() {
        let mut args = PersonaArguments::new(Persona::new("A", "m", ""));
        assert_eq!(args.best_argument(), None);

        args.opening = Some(Statement::Delivered("opening".to_string()));
        assert_eq!(args.best_argument(), Some("opening"));

        args.rebuttal = Some(Statement::Failed(InferenceError::Empty));
        assert_eq!(args.best_argument(), Some("opening"));

        args.rebuttal = Some(Statement::Delivered("rebuttal".to_string()));
        assert_eq!(args.best_argument(), Some("rebuttal"));
    }

    #[test]
    fn test_failed_statement_shows_marker() {
        let statement = Statement::from_result(Err(InferenceError::Timeout));
        assert!(!statement.is_delivered());
        assert_eq!(statement.transcript_text(), FAILURE_MARKER);
    }
}
