//! Tools for keeping notes while running language models on small machines:
//! the hand-kept table of model observations, study-note summarization into
//! quizzes, and recording of streamed responses.

pub mod catalog;
pub mod config;
pub mod logging;
pub mod model;
pub mod quiz;
pub mod repositories;
pub mod services;

pub use catalog::Catalog;
pub use config::config::Config;
pub use model::ModelObservation;
