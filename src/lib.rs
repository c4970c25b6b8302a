pub mod auth;
pub mod catalog;
pub mod certificates;
pub mod config;
pub mod db;
pub mod email;
pub mod enums;
pub mod error;
pub mod import;
pub mod inventory;
pub mod mailer;
pub mod models;
pub mod report;
pub mod routes;
pub mod schema;
pub mod state;
pub mod timezone;
pub mod utils;
