pub mod table;

use crate::catalog::table::{Alignment, MarkdownTable, TableIssue, TableRow};
use crate::model::ModelObservation;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const NAME_COLUMNS: [&str; 2] = ["name", "model"];
const ID_COLUMNS: [&str; 2] = ["id", "hash"];
const SIZE_COLUMNS: [&str; 1] = ["size"];
const COMMENT_COLUMNS: [&str; 3] = ["comment", "comments", "notes"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No table with model, id, size and comment columns found")]
    NoObservationTable,
}

/// A content problem in one row. `line` is `None` for rows added through
/// [`Catalog::insert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CatalogWarning {
    EmptyName {
        line: Option<usize>,
    },
    InvalidId {
        line: Option<usize>,
        id: String,
    },
    InvalidSize {
        line: Option<usize>,
        size: String,
    },
    DuplicateId {
        line: Option<usize>,
        id: String,
        first_line: Option<usize>,
    },
}

struct RowLocation(Option<usize>);

impl fmt::Display for RowLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(line) => write!(f, "line {}", line),
            None => f.write_str("inserted row"),
        }
    }
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogWarning::EmptyName { line } => {
                write!(f, "{}: empty model name", RowLocation(*line))
            }
            CatalogWarning::InvalidId { line, id } => {
                write!(f, "{}: id {:?} is not a hex hash prefix", RowLocation(*line), id)
            }
            CatalogWarning::InvalidSize { line, size } => {
                write!(f, "{}: size {:?} is not a storage size", RowLocation(*line), size)
            }
            CatalogWarning::DuplicateId {
                line,
                id,
                first_line,
            } => write!(
                f,
                "{}: id {} duplicates {}",
                RowLocation(*line),
                id,
                RowLocation(*first_line)
            ),
        }
    }
}

/// An observation together with the source line it was read from.
/// Rows added through [`Catalog::insert`] have no line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub line: Option<usize>,
    pub observation: ModelObservation,
}

/// The hand-kept table of model observations from a markdown document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    entries: Vec<Entry>,
    issues: Vec<TableIssue>,
}

struct Columns {
    name: usize,
    id: usize,
    size: usize,
    comment: usize,
}

impl Columns {
    fn locate(table: &MarkdownTable) -> Option<Self> {
        Some(Self {
            name: table.column(&NAME_COLUMNS)?,
            id: table.column(&ID_COLUMNS)?,
            size: table.column(&SIZE_COLUMNS)?,
            comment: table.column(&COMMENT_COLUMNS)?,
        })
    }

    fn read(&self, row: &TableRow) -> ModelObservation {
        ModelObservation::new(
            row.cell(self.name),
            row.cell(self.id),
            row.cell(self.size),
            row.cell(self.comment),
        )
    }
}

impl Catalog {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Catalog, CatalogError> {
        let path = path.as_ref();
        debug!("Reading observation table from {}", path.display());
        let markdown = tokio::fs::read_to_string(path).await?;
        Catalog::from_markdown(&markdown)
    }

    pub fn from_markdown(markdown: &str) -> Result<Catalog, CatalogError> {
        let (table, columns) = MarkdownTable::parse_all(markdown)
            .into_iter()
            .find_map(|table| Columns::locate(&table).map(|columns| (table, columns)))
            .ok_or(CatalogError::NoObservationTable)?;

        let issues = table.check();
        for issue in &issues {
            warn!("Malformed observation table: {}", issue);
        }

        let entries = table
            .rows
            .iter()
            .map(|row| Entry {
                line: Some(row.line),
                observation: columns.read(row),
            })
            .collect();

        Ok(Catalog { entries, issues })
    }

    pub fn observations(&self) -> impl Iterator<Item = &ModelObservation> {
        self.entries.iter().map(|entry| &entry.observation)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Structural problems of the source table.
    pub fn issues(&self) -> &[TableIssue] {
        &self.issues
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ModelObservation> {
        let name = name.trim();
        self.observations()
            .find(|observation| observation.name.trim().eq_ignore_ascii_case(name))
    }

    /// Every observation whose id shares the given hex prefix.
    pub fn find_by_id(&self, prefix: &str) -> Vec<&ModelObservation> {
        self.observations()
            .filter(|observation| {
                observation
                    .artifact_id()
                    .is_ok_and(|id| id.matches_prefix(prefix))
            })
            .collect()
    }

    /// Adds a row, replacing an existing row with the same model name.
    pub fn insert(&mut self, observation: ModelObservation) {
        let existing = self.entries.iter_mut().find(|entry| {
            entry
                .observation
                .name
                .trim()
                .eq_ignore_ascii_case(observation.name.trim())
        });
        match existing {
            Some(entry) => entry.observation = observation,
            None => self.entries.push(Entry {
                line: None,
                observation,
            }),
        }
    }

    /// Content checks on the free-text fields. Never fails the load.
    pub fn lint(&self) -> Vec<CatalogWarning> {
        let mut warnings = Vec::new();
        let mut seen_ids: HashMap<String, Option<usize>> = HashMap::new();

        for entry in &self.entries {
            let line = entry.line;
            let observation = &entry.observation;

            if observation.name.trim().is_empty() {
                warnings.push(CatalogWarning::EmptyName { line });
            }
            match observation.artifact_id() {
                Ok(id) => {
                    if let Some(first_line) = seen_ids.get(id.as_str()) {
                        warnings.push(CatalogWarning::DuplicateId {
                            line,
                            id: id.to_string(),
                            first_line: *first_line,
                        });
                    } else {
                        seen_ids.insert(id.to_string(), line);
                    }
                }
                Err(_) => warnings.push(CatalogWarning::InvalidId {
                    line,
                    id: observation.id.clone(),
                }),
            }
            if observation.parsed_size().is_none() {
                warnings.push(CatalogWarning::InvalidSize {
                    line,
                    size: observation.size.clone(),
                });
            }
        }

        warnings
    }

    /// The observations as a normalized four-column table.
    pub fn to_markdown(&self) -> String {
        let header = TableRow {
            line: 1,
            cells: ["Model", "ID", "Size", "Comment"]
                .iter()
                .map(|cell| cell.to_string())
                .collect(),
        };
        let rows = self
            .observations()
            .enumerate()
            .map(|(index, observation)| TableRow {
                line: index + 3,
                cells: vec![
                    observation.name.clone(),
                    observation.id.clone(),
                    observation.size.clone(),
                    observation.comment.clone(),
                ],
            })
            .collect();
        MarkdownTable {
            header,
            alignments: vec![Alignment::None; 4],
            delimiter_line: 2,
            rows,
        }
        .render()
    }
}
