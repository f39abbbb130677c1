pub mod auth;
pub mod phone;
pub mod visit;
