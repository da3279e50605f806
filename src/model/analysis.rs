use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    /// Length of the note in characters.
    pub length: usize,
    pub chunks_processed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Concept {
    pub term: String,
    pub category: String,
}

/// Everything generated for one note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteAnalysis {
    pub summary: Summary,
    pub quiz: Vec<QuizQuestion>,
    pub concepts: Vec<Concept>,
}
