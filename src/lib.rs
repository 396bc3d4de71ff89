pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod library;
pub mod logging;
pub mod models;
pub mod omdb;
pub mod processor;
pub mod provider;
pub mod report;
pub mod scraper;

#[cfg(test)]
mod testing;
