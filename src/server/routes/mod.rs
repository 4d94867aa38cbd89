//! HTTP route handlers

pub mod health;
pub mod models;
pub mod status;
pub mod tools;
pub mod train;
pub mod voice;
