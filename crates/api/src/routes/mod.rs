//! HTTP Route Handlers

pub mod health;
pub mod readings;
pub mod records;
