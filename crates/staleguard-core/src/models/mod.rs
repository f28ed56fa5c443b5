pub mod classification;
pub mod org;
pub mod project;
pub mod target;
