// src/services/mod.rs

pub mod auth;
pub mod matching;
pub mod phone;
pub mod session;
pub mod visit_service;
pub mod wizard;
