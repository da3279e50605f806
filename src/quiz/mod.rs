pub mod brightspace;
