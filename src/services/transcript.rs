use chrono::NaiveDateTime;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Specified prompt file '{0}' does not exist")]
    PromptFileMissing(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Response stream failed: {0}")]
    Stream(String),
}

/// Picks the prompt: explicit text, then the prompt file, then a joke request
/// stamped with `now`.
pub async fn resolve_prompt(
    prompt: Option<&str>,
    prompt_file: Option<&Path>,
    now: NaiveDateTime,
) -> Result<String, TranscriptError> {
    if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
        return Ok(prompt.to_string());
    }
    if let Some(path) = prompt_file {
        if !tokio::fs::try_exists(path).await? {
            error!("Prompt file {} does not exist", path.display());
            return Err(TranscriptError::PromptFileMissing(path.to_path_buf()));
        }
        let text = tokio::fs::read_to_string(path).await?;
        return Ok(text.trim().to_string());
    }
    Ok(now
        .format("Please tell me a joke for The Year %Y, %B %d at %H:%M:%S")
        .to_string())
}

/// `dir/file_name`, or `dir/chat_<timestamp>.md` when no name is given.
pub fn transcript_path(dir: &Path, file_name: &str, now: NaiveDateTime) -> PathBuf {
    if file_name.is_empty() {
        dir.join(format!("chat_{}.md", now.format("%Y%m%d_%H%M%S")))
    } else {
        dir.join(file_name)
    }
}

/// Appends every chunk of a streamed response to `path`, flushing as it goes,
/// and echoes it to `echo`. Returns the full response text.
pub async fn record<S, E, W>(
    mut stream: S,
    path: &Path,
    echo: &mut W,
) -> Result<String, TranscriptError>
where
    S: Stream<Item = Result<String, E>> + Unpin,
    E: Display,
    W: AsyncWrite + Unpin,
{
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                file.flush().await?;
                error!("Response stream failed: {}", e);
                return Err(TranscriptError::Stream(e.to_string()));
            }
        };
        debug!("Received {} bytes", chunk.len());
        file.write_all(chunk.as_bytes()).await?;
        file.flush().await?;
        echo.write_all(chunk.as_bytes()).await?;
        echo.flush().await?;
        text.push_str(&chunk);
    }

    info!("Output saved to {}", path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use futures::stream;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 5)
            .unwrap()
            .and_hms_opt(12, 30, 7)
            .unwrap()
    }

    #[tokio::test]
    async fn prompt_priority() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prompt.md");
        tokio::fs::write(&file, "\n  Why is the sky blue?\n\n").await.unwrap();

        assert_eq!(
            resolve_prompt(Some("explicit"), Some(file.as_path()), noon()).await.unwrap(),
            "explicit"
        );
        assert_eq!(
            resolve_prompt(Some(""), Some(file.as_path()), noon()).await.unwrap(),
            "Why is the sky blue?"
        );
        assert_eq!(
            resolve_prompt(None, None, noon()).await.unwrap(),
            "Please tell me a joke for The Year 2024, November 05 at 12:30:07"
        );
        assert!(matches!(
            resolve_prompt(None, Some(dir.path().join("nope.md").as_path()), noon()).await,
            Err(TranscriptError::PromptFileMissing(_))
        ));
    }

    #[test]
    fn timestamped_default_name() {
        let dir = Path::new("/config/results");
        assert_eq!(
            transcript_path(dir, "", noon()),
            Path::new("/config/results/chat_20241105_123007.md")
        );
        assert_eq!(
            transcript_path(dir, "sky-blue.txt", noon()),
            Path::new("/config/results/sky-blue.txt")
        );
    }

    #[tokio::test]
    async fn records_and_echoes_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("chat.md");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "earlier\n").await.unwrap();

        let chunks = stream::iter(vec![
            Ok::<_, String>("The sky ".to_string()),
            Ok("is blue.".to_string()),
        ]);
        let mut echo = Vec::new();
        let text = record(chunks, &path, &mut echo).await.unwrap();

        assert_eq!(text, "The sky is blue.");
        assert_eq!(echo, b"The sky is blue.");
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "earlier\nThe sky is blue."
        );
    }

    #[tokio::test]
    async fn stream_error_keeps_what_was_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.md");
        let chunks = stream::iter(vec![
            Ok("partial".to_string()),
            Err("connection reset"),
            Ok("never".to_string()),
        ]);
        let mut echo = Vec::new();
        let result = record(chunks, &path, &mut echo).await;

        assert!(matches!(result, Err(TranscriptError::Stream(ref e)) if e == "connection reset"));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "partial");
    }
}
