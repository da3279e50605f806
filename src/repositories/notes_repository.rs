use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not valid UTF-8")]
    NotUtf8(PathBuf),
}

/// Markdown study notes stored below one directory.
pub struct NotesRepository {
    root: PathBuf,
    extension: String,
}

impl NotesRepository {
    pub fn new(root: impl Into<PathBuf>, extension: impl ToString) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string().trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every note below the root, sorted by path.
    pub async fn list_notes(&self) -> Result<Vec<PathBuf>, NotesError> {
        let mut notes = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let read_dir = tokio::fs::read_dir(&dir).await.map_err(|source| NotesError::Io {
                path: dir.clone(),
                source,
            })?;
            let mut entries = ReadDirStream::new(read_dir);
            while let Some(entry) = entries.next().await {
                let entry = entry.map_err(|source| NotesError::Io {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|source| NotesError::Io {
                    path: path.clone(),
                    source,
                })?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if self.is_note(&path) {
                    notes.push(path);
                }
            }
        }

        notes.sort();
        debug!("Found {} notes under {}", notes.len(), self.root.display());
        Ok(notes)
    }

    pub async fn read_note(&self, path: &Path) -> Result<String, NotesError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| NotesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|_| {
            error!("Note {} is not valid UTF-8", path.display());
            NotesError::NotUtf8(path.to_path_buf())
        })
    }

    fn is_note(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}
