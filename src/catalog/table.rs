//! GitHub-flavoured pipe tables: parsing, well-formedness checks and
//! normalized rendering.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static DELIMITER_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("hard-coded regex should always compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn from_delimiter(cell: &str) -> Self {
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        }
    }

    fn delimiter(self, width: usize) -> String {
        match self {
            Alignment::None => "-".repeat(width),
            Alignment::Left => format!(":{}", "-".repeat(width - 1)),
            Alignment::Right => format!("{}:", "-".repeat(width - 1)),
            Alignment::Center => format!(":{}:", "-".repeat(width - 2)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// 1-based line in the source document.
    pub line: usize,
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableIssue {
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    DelimiterCount {
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableIssue::ColumnCount {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {}: row has {} cells, header has {}",
                line, found, expected
            ),
            TableIssue::DelimiterCount {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {}: delimiter row has {} cells, header has {}",
                line, found, expected
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkdownTable {
    pub header: TableRow,
    pub alignments: Vec<Alignment>,
    pub delimiter_line: usize,
    pub rows: Vec<TableRow>,
}

impl MarkdownTable {
    /// Every pipe table in a markdown document, in document order. Tables
    /// inside fenced code blocks are skipped.
    pub fn parse_all(markdown: &str) -> Vec<MarkdownTable> {
        let lines: Vec<&str> = markdown.lines().collect();
        let fenced = fenced_lines(&lines);
        let mut tables = Vec::new();
        let mut i = 0;

        while i + 1 < lines.len() {
            let (header, delimiter) = (lines[i], lines[i + 1]);
            let alignments = match parse_delimiter(delimiter) {
                Some(alignments) if is_row(header) && !fenced[i] && !fenced[i + 1] => {
                    alignments
                }
                _ => {
                    i += 1;
                    continue;
                }
            };

            let mut table = MarkdownTable {
                header: TableRow {
                    line: i + 1,
                    cells: split_cells(header),
                },
                alignments,
                delimiter_line: i + 2,
                rows: Vec::new(),
            };
            i += 2;
            while i < lines.len() && !fenced[i] && is_row(lines[i]) {
                table.rows.push(TableRow {
                    line: i + 1,
                    cells: split_cells(lines[i]),
                });
                i += 1;
            }
            tables.push(table);
        }

        tables
    }

    pub fn width(&self) -> usize {
        self.header.cells.len()
    }

    /// Column index of the first header matching any of `names`, ignoring case.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        self.header.cells.iter().position(|cell| {
            names
                .iter()
                .any(|name| cell.trim().eq_ignore_ascii_case(name))
        })
    }

    pub fn check(&self) -> Vec<TableIssue> {
        let expected = self.width();
        let mut issues = Vec::new();

        if self.alignments.len() != expected {
            issues.push(TableIssue::DelimiterCount {
                line: self.delimiter_line,
                expected,
                found: self.alignments.len(),
            });
        }
        for row in &self.rows {
            if row.cells.len() != expected {
                issues.push(TableIssue::ColumnCount {
                    line: row.line,
                    expected,
                    found: row.cells.len(),
                });
            }
        }

        issues
    }

    pub fn is_well_formed(&self) -> bool {
        self.check().is_empty()
    }

    /// Rows are padded (or cut) to the header width and columns aligned.
    pub fn render(&self) -> String {
        let width = self.width();
        let escape_row = |row: &TableRow| -> Vec<String> {
            (0..width).map(|column| escape_cell(row.cell(column))).collect()
        };
        let header = escape_row(&self.header);
        let rows: Vec<Vec<String>> = self.rows.iter().map(escape_row).collect();
        let alignments: Vec<Alignment> = (0..width)
            .map(|column| {
                self.alignments
                    .get(column)
                    .copied()
                    .unwrap_or(Alignment::None)
            })
            .collect();

        let widths: Vec<usize> = (0..width)
            .map(|column| {
                rows.iter()
                    .map(|row| row[column].chars().count())
                    .chain(std::iter::once(header[column].chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut out = String::new();
        push_line(&mut out, &header, &widths);
        let delimiter: Vec<String> = alignments
            .iter()
            .zip(&widths)
            .map(|(alignment, width)| alignment.delimiter(*width))
            .collect();
        push_line(&mut out, &delimiter, &widths);
        for row in &rows {
            push_line(&mut out, row, &widths);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        out.push_str(&format!(" {:<width$} |", cell, width = *width));
    }
    out.push('\n');
}

fn is_row(line: &str) -> bool {
    !line.trim().is_empty() && line.contains('|')
}

fn parse_delimiter(line: &str) -> Option<Vec<Alignment>> {
    if !line.contains('|') {
        return None;
    }
    let cells = split_cells(line);
    if cells.is_empty() || !cells.iter().all(|cell| DELIMITER_CELL.is_match(cell)) {
        return None;
    }
    Some(
        cells
            .iter()
            .map(|cell| Alignment::from_delimiter(cell))
            .collect(),
    )
}

/// Marks the lines that open, close or sit inside a ``` or ~~~ code fence.
/// An unclosed fence runs to the end of the document.
fn fenced_lines(lines: &[&str]) -> Vec<bool> {
    let mut fenced = Vec::with_capacity(lines.len());
    let mut open: Option<(char, usize)> = None;

    for line in lines {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~');
        let run = marker.map_or(0, |c| trimmed.chars().take_while(|x| *x == c).count());

        match (open, marker) {
            (None, Some(c)) if run >= 3 => {
                open = Some((c, run));
                fenced.push(true);
            }
            (Some((c, len)), Some(m))
                if m == c && run >= len && trimmed[run..].trim().is_empty() =>
            {
                open = None;
                fenced.push(true);
            }
            (Some(_), _) => fenced.push(true),
            (None, _) => fenced.push(false),
        }
    }
    fenced
}

/// Splits a row on unescaped pipes; outer pipes are optional.
pub fn split_cells(line: &str) -> Vec<String> {
    let mut line = line.trim();
    if let Some(rest) = line.strip_prefix('|') {
        line = rest;
    }
    if line.ends_with('|') && !line.ends_with("\\|") {
        line = &line[..line.len() - 1];
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

pub fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = "\
# Local models

Notes on what fits where.

| Model | ID | Size | Comment |
|-------|----|-----:|---------|
| llama3.2:1b | baf6a787fdff | 1.3 GB | will run on pi5 8MB |
| phi4:14b | ac896e5b8b34 | 9.1 GB | too large for pi5 8MB? |

More prose.
";

    #[test]
    fn finds_the_table_and_its_lines() {
        let tables = MarkdownTable::parse_all(README);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.header.line, 5);
        assert_eq!(table.delimiter_line, 6);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].line, 8);
        assert_eq!(table.rows[1].cell(3), "too large for pi5 8MB?");
        assert_eq!(table.alignments[2], Alignment::Right);
        assert!(table.is_well_formed());
    }

    #[test]
    fn reports_inconsistent_rows() {
        let markdown = "a | b | c\n--- | --- | ---\n1 | 2\n1 | 2 | 3 | 4\n1 | 2 | 3\n";
        let table = &MarkdownTable::parse_all(markdown)[0];
        assert_eq!(
            table.check(),
            vec![
                TableIssue::ColumnCount {
                    line: 3,
                    expected: 3,
                    found: 2
                },
                TableIssue::ColumnCount {
                    line: 4,
                    expected: 3,
                    found: 4
                },
            ]
        );
    }

    #[test]
    fn reports_short_delimiter() {
        let table = &MarkdownTable::parse_all("| a | b |\n|---|\n")[0];
        assert_eq!(
            table.check(),
            vec![TableIssue::DelimiterCount {
                line: 2,
                expected: 2,
                found: 1
            }]
        );
    }

    #[test]
    fn escaped_pipes_stay_in_the_cell() {
        assert_eq!(
            split_cells(r"| a \| b | c |"),
            vec!["a | b".to_string(), "c".to_string()]
        );
        assert_eq!(split_cells(r"x | y \|"), vec!["x".to_string(), "y |".to_string()]);
    }

    #[test]
    fn ignores_lines_that_are_not_tables() {
        let markdown = "Title\n---\n\nsome | text\nno delimiter here\n";
        assert!(MarkdownTable::parse_all(markdown).is_empty());
    }

    #[test]
    fn render_pads_and_aligns() {
        let markdown = "| a | long header |\n|:-:|---|\n| x \\| y |\n";
        let rendered = MarkdownTable::parse_all(markdown)[0].render();
        assert_eq!(
            rendered,
            "| a      | long header |\n\
             | :----: | ----------- |\n\
             | x \\| y |             |\n"
        );
        let reparsed = &MarkdownTable::parse_all(&rendered)[0];
        assert!(reparsed.is_well_formed());
        assert_eq!(reparsed.rows[0].cell(0), "x | y");
    }

    #[test]
    fn skips_tables_in_code_fences() {
        let markdown = "\
Example:

```markdown
| a | b |
|---|---|
| 1 | 2 |
```

~~~~
| c |
|---|
~~~
| still fenced |
~~~~

| real | table |
|------|-------|
| 3    | 4     |
";
        let tables = MarkdownTable::parse_all(markdown);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header.cells, vec!["real", "table"]);
        assert_eq!(tables[0].header.line, 16);
        assert_eq!(tables[0].rows.len(), 1);
    }

    #[test]
    fn fence_ends_a_table_body() {
        let markdown = "| a |\n|---|\n| 1 |\n```\n| 2 |\n```\n";
        let tables = MarkdownTable::parse_all(markdown);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 1);
    }
}
