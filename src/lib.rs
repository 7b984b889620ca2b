pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod index;
pub mod models;
pub mod nas;
pub mod routes;
pub mod schema;
pub mod settings;
pub mod state;
pub mod utils;
