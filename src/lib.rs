pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
