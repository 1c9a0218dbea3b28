//! Prompt construction.
//!
//! Prompts are plain text assembled by substitution. Every prompt a persona
//! receives starts with that persona's stance so it argues consistently
//! across phases.

use crate::ballot::ArgumentMap;
use crate::persona::Persona;
use crate::session::PersonaArguments;

/// Recorded in place of a statement the model failed to produce.
pub const FAILURE_MARKER: &str = "Error: No response from model.";

/// Argument text for a persona that produced nothing usable.
pub const MISSING_ARGUMENT: &str = "N/A";

pub fn opening_prompt(persona: &Persona, hint: &str, question: &str) -> String {
    format!(
        r#"{stance}
{hint}

You are debating the question: "{question}"

Write a concise, single-paragraph opening statement from your perspective.
Do not include any pre-amble."#,
        stance = persona.stance(),
        hint = hint.trim_end(),
        question = question,
    )
}

/// Every persona's opening (or failure marker), in registry order.
pub fn openings_block(arguments: &[PersonaArguments]) -> String {
    arguments
        .iter()
        .map(|args| {
            let text = args
                .opening
                .as_ref()
                .map(|s| s.transcript_text())
                .unwrap_or(MISSING_ARGUMENT);
            format!("Argument from {}:\n{}\n\n", args.persona.name, text)
        })
        .collect()
}

pub fn rebuttal_prompt(persona: &Persona, question: &str, openings: &str) -> String {
    format!(
        r#"{stance}

The debate is on: "{question}"

Here are all the opening statements:
{openings}
Write a single, persuasive rebuttal paragraph that responds to your opponents
from your perspective. Do not include any pre-amble."#,
        stance = persona.stance(),
        question = question,
        openings = openings,
    )
}

/// The labelled arguments presented to every voter.
pub fn arguments_block(map: &ArgumentMap) -> String {
    map.iter()
        .map(|entry| {
            format!(
                "Argument {} ({}):\n{}\n\n",
                entry.label, entry.persona, entry.text
            )
        })
        .collect()
}

pub fn vote_prompt(persona: &Persona, arguments: &str) -> String {
    format!(
        r#"{stance}

Here are the arguments:
{arguments}
Setting your own perspective aside, act as an impartial judge. Vote for the argument
(by number) that you found most persuasive, and write a sentence why you chose that argument."#,
        stance = persona.stance(),
        arguments = arguments,
    )
}
