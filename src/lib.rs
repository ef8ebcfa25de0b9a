// src/lib.rs

//! contest-watch library
//!
//! Scrapes the wevity.com naming-contest listing, merges it into a JSON list
//! kept in a remote store and announces postings it has not seen before.

pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
