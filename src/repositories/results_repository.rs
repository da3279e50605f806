use crate::model::analysis::{Concept, NoteAnalysis, QuizQuestion, Summary};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Note path has no file name: {0}")]
    NoStem(PathBuf),
}

/// The three result files kept for one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPaths {
    pub summary: PathBuf,
    pub quiz: PathBuf,
    pub concepts: PathBuf,
}

impl ResultPaths {
    fn all(&self) -> [&Path; 3] {
        [self.summary.as_path(), self.quiz.as_path(), self.concepts.as_path()]
    }
}

pub struct ResultsRepository {
    dir: PathBuf,
}

impl ResultsRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn paths_for(&self, note: &Path) -> Result<ResultPaths, ResultsError> {
        let stem = note
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| ResultsError::NoStem(note.to_path_buf()))?;
        Ok(ResultPaths {
            summary: self.dir.join(format!("{}_summary.json", stem)),
            quiz: self.dir.join(format!("{}_quiz.json", stem)),
            concepts: self.dir.join(format!("{}_concepts.json", stem)),
        })
    }

    /// True only when all three result files exist.
    pub async fn has_results(&self, note: &Path) -> bool {
        let Ok(paths) = self.paths_for(note) else {
            return false;
        };
        for path in paths.all() {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return false;
            }
        }
        true
    }

    pub async fn save(&self, note: &Path, analysis: &NoteAnalysis) -> Result<(), ResultsError> {
        let paths = self.paths_for(note)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ResultsError::Io {
                path: self.dir.clone(),
                source,
            })?;

        write_json(&paths.summary, &analysis.summary).await?;
        write_json(&paths.quiz, &analysis.quiz).await?;
        write_json(&paths.concepts, &analysis.concepts).await?;
        debug!("Saved results for {}", note.display());
        Ok(())
    }

    pub async fn load(&self, note: &Path) -> Result<NoteAnalysis, ResultsError> {
        let paths = self.paths_for(note)?;
        let summary: Summary = read_json(&paths.summary).await?;
        let quiz: Vec<QuizQuestion> = read_json(&paths.quiz).await?;
        let concepts: Vec<Concept> = read_json(&paths.concepts).await?;
        Ok(NoteAnalysis {
            summary,
            quiz,
            concepts,
        })
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ResultsError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ResultsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ResultsError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&text).map_err(|source| ResultsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> NoteAnalysis {
        NoteAnalysis {
            summary: Summary {
                summary: "Les clés primaires — uniques".to_string(),
                length: 42,
                chunks_processed: 1,
            },
            quiz: vec![QuizQuestion {
                question: "What is a primary key?".to_string(),
                options: vec!["A unique row id".to_string(), "A password".to_string()],
                correct_answer: "A unique row id".to_string(),
            }],
            concepts: vec![Concept {
                term: "primary key".to_string(),
                category: "term".to_string(),
            }],
        }
    }

    #[test]
    fn result_file_names_follow_the_note_stem() {
        let repository = ResultsRepository::new("/results");
        let paths = repository.paths_for(Path::new("/notes/week1/sql.md")).unwrap();
        assert_eq!(paths.summary, Path::new("/results/sql_summary.json"));
        assert_eq!(paths.quiz, Path::new("/results/sql_quiz.json"));
        assert_eq!(paths.concepts, Path::new("/results/sql_concepts.json"));
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let repository = ResultsRepository::new(dir.path().join("results"));
        let note = Path::new("sql.md");

        assert!(!repository.has_results(note).await);
        repository.save(note, &analysis()).await.unwrap();
        assert!(repository.has_results(note).await);
        assert_eq!(repository.load(note).await.unwrap(), analysis());

        let raw = tokio::fs::read_to_string(repository.paths_for(note).unwrap().summary)
            .await
            .unwrap();
        assert!(raw.contains("Les clés primaires — uniques"));
        assert!(raw.contains("\n  \"length\": 42"));
    }

    #[tokio::test]
    async fn partial_results_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let repository = ResultsRepository::new(dir.path());
        let note = Path::new("sql.md");
        repository.save(note, &analysis()).await.unwrap();
        tokio::fs::remove_file(repository.paths_for(note).unwrap().concepts)
            .await
            .unwrap();
        assert!(!repository.has_results(note).await);
    }
}
