pub mod engine;
pub mod report;
pub mod tagger;
