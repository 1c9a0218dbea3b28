//! Persona definitions and the ordered persona registry.
//!
//! A persona is a named argumentative stance bound to one model. The
//! registry keeps personas in registration order, which is the order used
//! for speaking and for assigning argument labels at vote time.

use serde::{Deserialize, Serialize};

use crate::error::DebateError;

/// An AI persona on the panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    /// Unique display name.
    pub name: String,
    /// The model backing this persona (e.g., "llama3:8b", "gpt-4o").
    pub model: String,
    /// Free text establishing the persona's stance.
    #[serde(default)]
    pub description: String,
}

impl Persona {
    /// Create a new persona with the given name, model, and description.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: description.into(),
        }
    }

    /// The stance text used in prompts, falling back to a bare identity line.
    pub fn stance(&self) -> String {
        let description = self.description.trim();
        if description.is_empty() {
            format!("You are a {}.", self.name)
        } else {
            description.to_string()
        }
    }

    /// Name with the model in parentheses, as shown in transcripts.
    pub fn display_name_with_model(&self) -> String {
        format!("{} ({})", self.name, self.model)
    }
}

/// Ordered set of personas with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// Build a registry, rejecting duplicate names.
    pub fn new(personas: Vec<Persona>) -> Result<Self, DebateError> {
        let mut registry = Self::default();
        for persona in personas {
            registry.add(persona)?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.personas.iter().map(|p| p.name.as_str()).collect()
    }

    /// Append a persona at the end of the speaking order.
    pub fn add(&mut self, persona: Persona) -> Result<(), DebateError> {
        if self.get(&persona.name).is_some() {
            return Err(DebateError::DuplicatePersona(persona.name));
        }
        self.personas.push(persona);
        Ok(())
    }

    /// Remove a persona by name, returning it.
    pub fn remove(&mut self, name: &str) -> Result<Persona, DebateError> {
        let idx = self.position(name)?;
        Ok(self.personas.remove(idx))
    }

    /// Change the model and/or description of an existing persona.
    pub fn update(
        &mut self,
        name: &str,
        model: Option<String>,
        description: Option<String>,
    ) -> Result<(), DebateError> {
        let idx = self.position(name)?;
        let persona = &mut self.personas[idx];
        if let Some(model) = model {
            persona.model = model;
        }
        if let Some(description) = description {
            persona.description = description;
        }
        Ok(())
    }

    /// Rename a persona in place, keeping its position in the order.
    pub fn rename(&mut self, name: &str, new_name: impl Into<String>) -> Result<(), DebateError> {
        let new_name = new_name.into();
        if new_name == name {
            return Ok(());
        }
        if self.get(&new_name).is_some() {
            return Err(DebateError::DuplicatePersona(new_name));
        }
        let idx = self.position(name)?;
        self.personas[idx].name = new_name;
        Ok(())
    }

    pub fn into_vec(self) -> Vec<Persona> {
        self.personas
    }

    fn position(&self, name: &str) -> Result<usize, DebateError> {
        self.personas
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| DebateError::UnknownPersona(name.to_string()))
    }
}

/// The built-in panel used when no configuration file exists.
pub fn default_personas() -> Vec<Persona> {
    const MODEL: &str = "llama3:8b";
    vec![
        Persona::new(
            "Modern Liberal",
            MODEL,
            "You are a Modern Liberal. You believe that government has a moral obligation to care \
             for its citizens and address systemic inequalities. Your analysis must prioritize \
             fairness, community well-being, and environmental protection. You see collective \
             action, led by the government, as the best way to achieve a just society.",
        ),
        Persona::new(
            "Modern Conservative",
            MODEL,
            "You are a Modern Conservative. You believe in individual liberty, personal \
             responsibility, and the power of the free market. Your analysis must prioritize \
             limited government, economic freedom, and a strong rule of law. You believe that the \
             best solutions come from individual actors and private institutions, not government \
             bureaucracy.",
        ),
        Persona::new(
            "Libertarian",
            MODEL,
            "You are a Libertarian. Your single, core belief is in maximum individual freedom. \
             Your analysis must oppose any government intervention, economic or social, that is \
             not absolutely necessary to protect the life, liberty, and property of individuals. \
             You are skeptical of both the Liberal and Conservative positions, as you see both as \
             attempts to use government power to control people.",
        ),
    ]
}
