use std::sync::LazyLock;
use thiserror::Error;
use tiktoken_rs::CoreBPE;

static ENCODER: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("tiktoken-rs failed to load cl100k_base"));

/// Upper bound on the bytes one cl100k token covers, used to limit how far
/// ahead a chunk end is searched.
const MAX_BYTES_PER_TOKEN: usize = 128;

#[derive(Debug, Error, PartialEq)]
pub enum ChunkError {
    #[error("Chunk token budget must be greater than zero")]
    ZeroBudget,
}

/// Number of cl100k_base tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    ENCODER.encode_with_special_tokens(text).len()
}

/// Splits `text` into consecutive slices of at most `max_tokens` tokens each.
/// Joining the slices gives back `text`. Slices end on char boundaries, so a
/// single character that needs more tokens than the budget gets a chunk of
/// its own.
pub fn split_into_chunks(text: &str, max_tokens: usize) -> Result<Vec<&str>, ChunkError> {
    if max_tokens == 0 {
        return Err(ChunkError::ZeroBudget);
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if count_tokens(rest) <= max_tokens {
            chunks.push(rest);
            break;
        }

        let horizon = max_tokens.saturating_mul(MAX_BYTES_PER_TOKEN);
        let ends: Vec<usize> = rest
            .char_indices()
            .map(|(start, c)| start + c.len_utf8())
            .take_while(|&end| end <= horizon)
            .collect();
        let fitting = ends.partition_point(|&end| count_tokens(&rest[..end]) <= max_tokens);
        let end = match fitting {
            0 => rest.chars().next().map_or(rest.len(), char::len_utf8),
            n => ends[n - 1],
        };

        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    Ok(chunks)
}
