// src/handlers/mod.rs

pub mod auth;
pub mod contacts;
pub mod drafts;
pub mod phone;
pub mod reference;
pub mod session;
pub mod visits;
