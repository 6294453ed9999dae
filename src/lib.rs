pub mod adapters;
pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod lifecycle;
pub mod observability;
pub mod ports;
