pub mod chunker;
pub mod study_pipeline;
pub mod transcript;
