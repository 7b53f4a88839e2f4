pub mod auth;
pub mod contact;
pub mod error;
pub mod health;
pub mod root;
