pub mod accounts;
pub mod core;
pub mod curriculum;
pub mod fitness;
pub mod lessons;
pub mod reports;
pub mod scoring;
pub mod setup;
pub mod students;
pub mod suggestions;
