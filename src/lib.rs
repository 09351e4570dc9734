pub mod app;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod excel;
pub mod fetch;
pub mod grid;
pub mod nc;
pub mod output;
pub mod parse;
pub mod sources;
pub mod table;
pub mod transform;
