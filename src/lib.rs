pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gemini;
pub mod models;
pub mod preprocess;
pub mod routes;
pub mod session;
pub mod styles;
