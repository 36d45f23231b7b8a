pub mod address;
pub mod app;
pub mod config;
pub mod documents;
pub mod form;
pub mod listing;
pub mod logging;
pub mod notice;
pub mod utils;
