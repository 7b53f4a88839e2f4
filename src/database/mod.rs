pub mod contact;
pub mod error;
pub mod postgres_repository;
pub mod session;
pub mod user;

use crate::database::contact::ContactRepository;
use crate::database::session::SessionRepository;
use crate::database::user::UserRepository;
use std::sync::Arc;

/// Every store the HTTP surface needs, behind one object.
pub trait Repository: UserRepository + SessionRepository + ContactRepository + Send + Sync {}

impl<T> Repository for T where T: UserRepository + SessionRepository + ContactRepository + Send + Sync {}

/// Repository handle managed as Rocket state.
pub type SharedRepository = Arc<dyn Repository>;
