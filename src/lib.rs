pub mod book;
pub mod cli_args;
pub mod database;
pub mod error;
mod extractor;
mod middleware;
pub mod repository;
mod route;
pub mod server;
pub mod state;
