pub mod jwt;
pub mod models;
pub mod tokens;
