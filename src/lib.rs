pub mod cli;
pub mod config;
pub mod error;
pub mod openapi;
pub mod report;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod test_support;
