pub mod contact;
pub mod pagination;
pub mod response;
pub mod session;
pub mod user;
