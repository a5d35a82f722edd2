pub mod answer;
pub mod events;
pub mod execution;
pub mod question;
pub mod section;
pub mod submission;
pub mod violation;
