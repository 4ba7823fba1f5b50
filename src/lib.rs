//! Library crate for wordle-golf-back, exposing modules for binaries and integration tests.

pub mod app;
pub mod clients;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod scoring;
pub mod services;
pub mod state;
