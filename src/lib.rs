pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod navigation;
pub mod output;
pub mod query;
pub mod session;
pub mod status;

#[cfg(test)]
mod tests;
