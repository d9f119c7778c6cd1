//! Database document types and the partition machinery around them.
//!
//! Registry types ([`admin`], [`survey`]) live in the shared registry
//! database; tenant types ([`question`], [`response`], [`opinion`],
//! [`upvote`]) exist once per survey partition and can only be reached
//! through a resolved [`partition::Partition`].

pub mod admin;
pub mod opinion;
pub mod partition;
pub mod question;
pub mod response;
pub mod survey;
pub mod upvote;
