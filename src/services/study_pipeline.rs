//! Incremental summarization of study notes: each note is summarized chunk by
//! chunk, then quiz questions and key concepts are drawn from the summary.
//! Results are stored per note so a later run only handles new notes.

use crate::config::config::RetryConfig;
use crate::model::analysis::{Concept, NoteAnalysis, QuizQuestion, Summary};
use crate::repositories::notes_repository::{NotesError, NotesRepository};
use crate::repositories::results_repository::{ResultsError, ResultsRepository};
use crate::services::chunker::{ChunkError, split_into_chunks};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::Path;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

const SUMMARY_PROMPT: &str = "Analyze the following study notes and provide a detailed summary \
focusing on key points and main ideas:\n\n";

const QUIZ_PROMPT: &str = "Based on the content, generate 5 multiple choice questions. \
Format each question as a JSON object with 'question', 'options' (array), \
and 'correct_answer' fields.\n\n";

const CONCEPT_PROMPT: &str = "Extract and list all key terms, concepts, products, services, \
and acronyms from the content. Format the response as a JSON array of objects with 'term' \
and 'category' fields.\n\n";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerateError {
    #[error("Generator failed: {0}")]
    Failed(String),
}

/// Anything that turns a prompt into text.
pub trait Generator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

/// Retries a generator with exponential backoff (`base * 2^attempt`).
pub struct Retrying<G> {
    inner: G,
    retry: RetryConfig,
}

impl<G: Generator + Sync> Retrying<G> {
    pub fn new(inner: G, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

impl<G: Generator + Sync> Generator for Retrying<G> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let attempts = self.retry.attempts();
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    attempt += 1;
                    if attempt >= attempts {
                        error!("Generation failed after {} attempts", attempts);
                        return Err(e);
                    }
                    let factor = 2u32.saturating_pow(attempt - 1);
                    sleep(self.retry.base_delay().saturating_mul(factor)).await;
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Notes(#[from] NotesError),
    #[error(transparent)]
    Results(#[from] ResultsError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error("No chunk of the note could be summarized")]
    NothingSummarized,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct StudyPipeline<G> {
    generator: G,
    notes: NotesRepository,
    results: ResultsRepository,
    max_tokens: usize,
}

impl<G: Generator + Sync> StudyPipeline<G> {
    pub fn new(
        generator: G,
        notes: NotesRepository,
        results: ResultsRepository,
        max_tokens: usize,
    ) -> Self {
        Self {
            generator,
            notes,
            results,
            max_tokens,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Summary, quiz questions and key concepts for one note.
    pub async fn analyze(&self, content: &str) -> Result<NoteAnalysis, PipelineError> {
        let chunks = split_into_chunks(content, self.max_tokens)?;
        let mut summaries = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            debug!("Summarizing chunk {} of {}", index + 1, chunks.len());
            match self
                .generator
                .generate(&format!("{}{}", SUMMARY_PROMPT, chunk))
                .await
            {
                Ok(summary) if !summary.trim().is_empty() => summaries.push(summary),
                Ok(_) => warn!("Empty summary for chunk {}", index + 1),
                Err(e) => warn!("Skipping chunk {}: {}", index + 1, e),
            }
        }
        if summaries.is_empty() && !chunks.is_empty() {
            return Err(PipelineError::NothingSummarized);
        }
        let full_summary = summaries.join("\n");

        let quiz_response = self
            .generator
            .generate(&format!("{}{}", QUIZ_PROMPT, full_summary))
            .await?;
        let quiz = parse_json_list(&quiz_response).unwrap_or_else(|| {
            warn!("Failed to parse quiz questions as JSON, keeping the raw response");
            vec![QuizQuestion {
                question: quiz_response.clone(),
                ..Default::default()
            }]
        });

        let concept_response = self
            .generator
            .generate(&format!("{}{}", CONCEPT_PROMPT, full_summary))
            .await?;
        let concepts = parse_json_list(&concept_response).unwrap_or_else(|| {
            warn!("Failed to parse concepts as JSON, keeping the raw response");
            vec![Concept {
                term: concept_response.clone(),
                category: "uncategorized".to_string(),
            }]
        });

        Ok(NoteAnalysis {
            summary: Summary {
                summary: full_summary,
                length: content.chars().count(),
                chunks_processed: chunks.len(),
            },
            quiz,
            concepts,
        })
    }

    /// Analyzes and stores the note unless its results already exist.
    /// Returns whether the note was processed.
    pub async fn process_note(&self, note: &Path) -> Result<bool, PipelineError> {
        if self.results.has_results(note).await {
            info!("Skipping {}, results already exist", note.display());
            return Ok(false);
        }

        info!("Processing {}", note.display());
        let content = self.notes.read_note(note).await?;
        if content.trim().is_empty() {
            info!("Skipping {}, note is empty", note.display());
            return Ok(false);
        }

        let analysis = self.analyze(&content).await?;
        self.results.save(note, &analysis).await?;
        info!("Successfully processed {}", note.display());
        Ok(true)
    }

    pub async fn process_all(&self) -> Result<ProcessReport, PipelineError> {
        let notes = self.notes.list_notes().await?;
        info!("Found {} markdown files to process", notes.len());

        let mut report = ProcessReport::default();
        for note in notes {
            match self.process_note(&note).await {
                Ok(true) => report.processed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    error!("Failed to process {}: {}", note.display(), e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

/// Parses a JSON array (or a single object) out of a model response that may
/// wrap it in prose or code fences.
fn parse_json_list<T: DeserializeOwned>(response: &str) -> Option<Vec<T>> {
    let start = response.find(['[', '{'])?;
    let end = response.rfind([']', '}'])?;
    if end < start {
        return None;
    }
    let json = &response[start..=end];
    serde_json::from_str::<Vec<T>>(json)
        .ok()
        .or_else(|| serde_json::from_str::<T>(json).ok().map(|item| vec![item]))
}
