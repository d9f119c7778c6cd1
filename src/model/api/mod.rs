//! Request and response bodies for the HTTP API.

pub mod admin;
pub mod opinion;
pub mod question;
pub mod report;
pub mod submission;
pub mod survey;
pub mod upvote;
