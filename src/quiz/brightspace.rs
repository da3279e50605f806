//! Brightspace question-library CSV.
//!
//! Every row has five columns. A question starts with a `NewQuestion` row,
//! lists its properties and options, and is followed by two empty rows:
//!
//! ```text
//! NewQuestion,MC,,,
//! ID,SQL-1,,,
//! Title,What does SQL stand for?,,,
//! QuestionText,What does SQL stand for?,,,
//! Points,1,,,
//! Difficulty,1,,,
//! Option,100,Structured Query Language,,
//! Option,0,Simple Queue Log,,
//! ,,,,
//! ,,,,
//! ```

use crate::model::analysis::QuizQuestion;
use thiserror::Error;
use tracing::warn;

const COLUMNS: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum QuizError {
    #[error("Question {id}: difficulty {difficulty} is outside 1..=10")]
    Difficulty { id: String, difficulty: u8 },
    #[error("Question {id}: no options")]
    NoOptions { id: String },
    #[error("Question {id}: option {index} has no text")]
    EmptyOption { id: String, index: usize },
    #[error("Question {id}: option weight {weight} is above 100")]
    Weight { id: String, weight: u8 },
    #[error("Question {id}: no correct option")]
    NoCorrectOption { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizOption {
    /// Percent of the points for multiple choice, 1 or 0 for multi-select.
    pub weight: u8,
    pub text: String,
    pub feedback: String,
}

impl QuizOption {
    pub fn new(weight: u8, text: impl ToString) -> Self {
        Self {
            weight,
            text: text.to_string(),
            feedback: String::new(),
        }
    }

    pub fn with_feedback(mut self, feedback: impl ToString) -> Self {
        self.feedback = feedback.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    MultipleChoice(Vec<QuizOption>),
    TrueFalse {
        answer: bool,
        true_feedback: String,
        false_feedback: String,
    },
    MultiSelect(Vec<QuizOption>),
}

impl QuestionKind {
    fn code(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice(_) => "MC",
            QuestionKind::TrueFalse { .. } => "TF",
            QuestionKind::MultiSelect(_) => "MS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub text: String,
    pub points: u32,
    pub difficulty: u8,
    pub hint: Option<String>,
    /// Shown for every answer, so it should explain the concept being tested.
    pub feedback: Option<String>,
    pub kind: QuestionKind,
}

impl Question {
    pub fn new(id: impl ToString, text: impl ToString, kind: QuestionKind) -> Self {
        let text = text.to_string();
        Self {
            id: id.to_string(),
            title: text.clone(),
            text,
            points: 1,
            difficulty: 1,
            hint: None,
            feedback: None,
            kind,
        }
    }

    pub fn validate(&self) -> Result<(), QuizError> {
        if !(1..=10).contains(&self.difficulty) {
            return Err(QuizError::Difficulty {
                id: self.id.clone(),
                difficulty: self.difficulty,
            });
        }

        let options = match &self.kind {
            QuestionKind::TrueFalse { .. } => return Ok(()),
            QuestionKind::MultipleChoice(options) | QuestionKind::MultiSelect(options) => options,
        };
        if options.is_empty() {
            return Err(QuizError::NoOptions {
                id: self.id.clone(),
            });
        }
        for (index, option) in options.iter().enumerate() {
            if option.text.trim().is_empty() {
                return Err(QuizError::EmptyOption {
                    id: self.id.clone(),
                    index: index + 1,
                });
            }
            if option.weight > 100 {
                return Err(QuizError::Weight {
                    id: self.id.clone(),
                    weight: option.weight,
                });
            }
        }

        let has_correct = match &self.kind {
            QuestionKind::MultipleChoice(options) => options.iter().any(|o| o.weight == 100),
            _ => options.iter().any(|o| o.weight > 0),
        };
        if !has_correct {
            return Err(QuizError::NoCorrectOption {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    fn rows(&self) -> Vec<[String; COLUMNS]> {
        let mut rows = vec![
            row(&["NewQuestion", self.kind.code()]),
            row(&["ID", self.id.as_str()]),
            row(&["Title", self.title.as_str()]),
            row(&["QuestionText", self.text.as_str()]),
            row(&["Points", self.points.to_string().as_str()]),
            row(&["Difficulty", self.difficulty.to_string().as_str()]),
        ];

        match &self.kind {
            QuestionKind::MultipleChoice(options) => {
                rows.extend(options.iter().map(option_row));
            }
            QuestionKind::MultiSelect(options) => {
                rows.push(row(&["Scoring", "RightAnswers"]));
                rows.extend(options.iter().map(option_row));
            }
            QuestionKind::TrueFalse {
                answer,
                true_feedback,
                false_feedback,
            } => {
                let (true_weight, false_weight) = if *answer { ("100", "0") } else { ("0", "100") };
                rows.push(row(&["TRUE", true_weight, true_feedback.as_str()]));
                rows.push(row(&["FALSE", false_weight, false_feedback.as_str()]));
            }
        }

        if let Some(hint) = &self.hint {
            rows.push(row(&["Hint", hint.as_str()]));
        }
        if let Some(feedback) = &self.feedback {
            rows.push(row(&["Feedback", feedback.as_str()]));
        }
        rows.push(row(&[]));
        rows.push(row(&[]));
        rows
    }
}

fn row(cells: &[&str]) -> [String; COLUMNS] {
    std::array::from_fn(|column| cells.get(column).map(|c| c.to_string()).unwrap_or_default())
}

fn option_row(option: &QuizOption) -> [String; COLUMNS] {
    row(&[
        "Option",
        option.weight.to_string().as_str(),
        option.text.as_str(),
        "",
        option.feedback.as_str(),
    ])
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Validates every question, then renders the whole quiz.
pub fn to_csv(questions: &[Question]) -> Result<String, QuizError> {
    for question in questions {
        question.validate()?;
    }

    let mut out = String::new();
    for question in questions {
        for cells in question.rows() {
            let line: Vec<String> = cells.iter().map(|cell| escape_field(cell)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
    }
    Ok(out)
}

/// Multiple-choice questions from generated quiz output, numbered
/// `<topic>-<n>` by their position in `generated`.
pub fn from_generated(topic: &str, generated: &[QuizQuestion]) -> Vec<Question> {
    generated
        .iter()
        .enumerate()
        .filter_map(|(index, generated)| {
            let id = format!("{}-{}", topic, index + 1);
            let options: Vec<&str> = generated
                .options
                .iter()
                .map(|o| o.trim())
                .filter(|o| !o.is_empty())
                .collect();
            if options.is_empty() {
                warn!("Question {} has no options, skipping", id);
                return None;
            }
            let Some(correct) = correct_index(&options, &generated.correct_answer) else {
                warn!(
                    "Question {}: answer {:?} matches no option, skipping",
                    id, generated.correct_answer
                );
                return None;
            };

            let options = options
                .iter()
                .enumerate()
                .map(|(i, text)| QuizOption::new(if i == correct { 100 } else { 0 }, text))
                .collect();
            Some(Question::new(
                id,
                generated.question.trim(),
                QuestionKind::MultipleChoice(options),
            ))
        })
        .collect()
}

/// The option equal to the answer, or the option named by a single letter.
fn correct_index(options: &[&str], answer: &str) -> Option<usize> {
    let answer = answer.trim();
    if let Some(index) = options.iter().position(|o| o.eq_ignore_ascii_case(answer)) {
        return Some(index);
    }
    let mut chars = answer.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => {
            let index = (letter.to_ascii_uppercase() as u8 - b'A') as usize;
            (index < options.len()).then_some(index)
        }
        _ => None,
    }
}
