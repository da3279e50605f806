use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TOO_LARGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(too (large|big)|won'?t (run|fit)|will not (run|fit)|does(n'?t| not) (run|fit|work)|not (ok|working)|out of memory|oom)\b")
        .expect("hard-coded regex should always compile")
});

static RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(will run|runs|running|fits|works|ok)\b")
        .expect("hard-coded regex should always compile")
});

static HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:on|for)\s+([^?.,;!()]+)").expect("hard-coded regex should always compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitVerdict {
    Runs,
    TooLarge,
    Unknown,
}

/// What the author wrote about running a model on a given host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FitNote {
    pub verdict: FitVerdict,
    /// The author marked the note with a question mark.
    pub tentative: bool,
    pub host: Option<String>,
}

impl FitNote {
    pub fn from_comment(comment: &str) -> Self {
        let verdict = if TOO_LARGE.is_match(comment) {
            FitVerdict::TooLarge
        } else if RUNS.is_match(comment) {
            FitVerdict::Runs
        } else {
            FitVerdict::Unknown
        };

        let host = HOST
            .captures(comment)
            .map(|caps| caps[1].trim().to_string())
            .filter(|host| !host.is_empty());

        Self {
            verdict,
            tentative: comment.contains('?'),
            host,
        }
    }
}
