//! `memberdesk-members` — member records and the data-store boundary.
//!
//! The data store (and its row-level security) lives elsewhere; this crate
//! defines the record shape and the async boundary trait the session flows
//! consume.

pub mod directory;
pub mod member;

pub use directory::{DirectoryError, MemberDirectory};
pub use member::Member;
