pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod git;
pub mod index;
pub mod intersect;
pub mod model;
pub mod parsers;
pub mod paths;
pub mod report;
