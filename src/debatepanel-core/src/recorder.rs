//! Outcome recording: the only write path into the history corpus.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::embedding::Embedder;
use crate::error::DebateError;
use crate::session::PersonaArguments;
use crate::store::{DebateStore, NewArgument};

/// Persists a decided debate.
#[async_trait]
pub trait OutcomeRecorder: Send + Sync {
    /// Returns the id of the stored debate.
    async fn persist(
        &self,
        question: &str,
        winner: &str,
        arguments: &[PersonaArguments],
    ) -> Result<i64, DebateError>;
}

/// Writes debates to the [`DebateStore`] and indexes rebuttals for retrieval.
pub struct StoreRecorder {
    embedder: Arc<dyn Embedder>,
    store: Arc<DebateStore>,
}

impl StoreRecorder {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<DebateStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl OutcomeRecorder for StoreRecorder {
    async fn persist(
        &self,
        question: &str,
        winner: &str,
        arguments: &[PersonaArguments],
    ) -> Result<i64, DebateError> {
        // Failed rebuttals leave no row; openings are never indexed.
        let rebuttals: Vec<(&PersonaArguments, String)> = arguments
            .iter()
            .filter_map(|a| a.delivered_rebuttal().map(|text| (a, text.to_string())))
            .collect();

        let texts: Vec<String> = rebuttals.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };

        let rows: Vec<NewArgument> = rebuttals
            .into_iter()
            .zip(embeddings)
            .map(|((args, text), embedding)| NewArgument {
                persona: args.persona.name.clone(),
                model: args.persona.model.clone(),
                phase: "rebuttal".to_string(),
                text,
                embedding,
            })
            .collect();

        let debate_id = self.store.record_debate(question, winner, &rows)?;
        info!(debate_id, winner, arguments = rows.len(), "debate recorded");
        Ok(debate_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::error::InferenceError;
    use crate::persona::Persona;
    use crate::session::Statement;

    fn args(name: &str, rebuttal: Statement) -> PersonaArguments {
        let mut a = PersonaArguments::new(Persona::new(name, format!("{name}-model"), ""));
        a.opening = Some(Statement::Delivered(format!("{name} opening")));
        a.rebuttal = Some(rebuttal);
        a
    }

    #[tokio::test]
    async fn test_failed_rebuttal_is_not_persisted() {
        let store = Arc::new(DebateStore::open_in_memory().unwrap());
        let recorder = StoreRecorder::new(Arc::new(HashingEmbedder::new(32)), store.clone());

        let arguments = vec![
            args("A", Statement::Delivered("A rebuts".to_string())),
            args("B", Statement::Failed(InferenceError::Timeout)),
            args("C", Statement::Delivered("C rebuts".to_string())),
        ];
        let id = recorder.persist("q", "C", &arguments).await.unwrap();

        let rows = store.arguments_for(id).unwrap();
        let personas: Vec<&str> = rows.iter().map(|r| r.persona.as_str()).collect();
        assert_eq!(personas, vec!["A", "C"]);
        assert!(rows.iter().all(|r| r.phase == "rebuttal"));
        assert_eq!(rows[1].model, "C-model");
        assert_eq!(store.debate(id).unwrap().unwrap().winning_persona.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn test_winner_flag_on_vectors() {
        let embedder = HashingEmbedder::new(32);
        let store = Arc::new(DebateStore::open_in_memory().unwrap());
        let recorder = StoreRecorder::new(Arc::new(embedder.clone()), store.clone());

        let arguments = vec![
            args("A", Statement::Delivered("A rebuts on energy".to_string())),
            args("B", Statement::Delivered("B rebuts on energy".to_string())),
        ];
        recorder.persist("energy?", "B", &arguments).await.unwrap();

        let probe = embedder.embed_text("energy");
        assert!(store.nearest("B", &probe, 2).unwrap()[0].is_winner);
        assert!(!store.nearest("A", &probe, 2).unwrap()[0].is_winner);
    }
}
