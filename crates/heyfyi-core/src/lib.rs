//! Core types and trait definitions for hey.fyi.
//!
//! This crate holds the account lifecycle, the vote-bank economy and the fact
//! domain. It is deliberately free of HTTP and database dependencies: storage
//! and outbound email are reached only through the traits in [`store`] and
//! [`notify`].

pub mod account;
pub mod credential;
pub mod error;
pub mod fact;
pub mod notify;
pub mod store;
pub mod vote_bank;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
