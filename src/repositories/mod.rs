pub mod notes_repository;
pub mod results_repository;
