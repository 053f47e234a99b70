//! Critic and audience ratings for TV series, scraped from rating sites and
//! reconciled against an expected release year.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod ratings;
pub mod scraper;
pub mod utils;
