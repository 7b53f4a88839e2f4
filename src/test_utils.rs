use crate::config::{Config, PasswordConfig};
use crate::database::contact::ContactRepository;
use crate::database::error::StoreError;
use crate::database::session::SessionRepository;
use crate::database::user::UserRepository;
use crate::models::contact::{Contact, ContactPatchRequest, ContactQuery, ContactRequest, ContactSortField, SortOrder};
use crate::models::session::{NewSession, Session};
use crate::models::user::{NewUser, User};
use crate::service::password::PasswordHasher;
use chrono::{Duration, Utc};
use std::cmp::Ordering;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use uuid::Uuid;

/// Config with cheap Argon2 costs and plain-HTTP cookies.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.password = PasswordConfig {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    };
    config.session.cookie_secure = false;
    config.logging.level = "warn".to_string();
    config
}

pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(&test_config().password).expect("test argon2 params are valid")
}

impl Contact {
    fn from_request(request: &ContactRequest, user_id: &Uuid) -> Self {
        let now = Utc::now();
        Contact {
            id: Uuid::new_v4(),
            user_id: *user_id,
            name: request.name.clone(),
            phone_number: request.phone_number.clone(),
            email: request.email.clone(),
            is_favourite: request.is_favourite,
            contact_type: request.contact_type,
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-memory store with the same uniqueness and scoping rules as Postgres.
#[derive(Default)]
pub struct MockRepository {
    users: Mutex<Vec<User>>,
    sessions: Mutex<Vec<Session>>,
    contacts: Mutex<Vec<Contact>>,
    /// Email lookups miss while set, as if another registration landed between
    /// the lookup and the insert.
    stale_email_lookups: AtomicBool,
}

impl MockRepository {
    pub fn session_count_for_user(&self, user_id: &Uuid) -> usize {
        self.sessions.lock().unwrap().iter().filter(|s| s.user_id == *user_id).count()
    }

    pub fn session_exists(&self, session_id: &Uuid) -> bool {
        self.sessions.lock().unwrap().iter().any(|s| s.id == *session_id)
    }

    pub fn stored_user(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.email == email).cloned()
    }

    /// Moves both expiries of a session into the past.
    pub fn expire_session(&self, session_id: &Uuid, access: bool, refresh: bool) {
        let past = Utc::now() - Duration::seconds(1);
        for session in self.sessions.lock().unwrap().iter_mut().filter(|s| s.id == *session_id) {
            if access {
                session.access_token_expires_at = past;
            }
            if refresh {
                session.refresh_token_expires_at = past;
            }
        }
    }

    pub fn set_stale_email_lookups(&self, stale: bool) {
        self.stale_email_lookups.store(stale, AtomicOrdering::SeqCst);
    }

    pub fn remove_user(&self, user_id: &Uuid) {
        self.users.lock().unwrap().retain(|u| u.id != *user_id);
    }
}

#[async_trait::async_trait]
impl UserRepository for MockRepository {
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateKey {
                constraint: "users_email_key".to_string(),
            });
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        if self.stale_email_lookups.load(AtomicOrdering::SeqCst) {
            return Ok(None);
        }
        Ok(self.stored_user(email))
    }

    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == *id).cloned())
    }
}

#[async_trait::async_trait]
impl SessionRepository for MockRepository {
    async fn create_session(&self, session: &NewSession) -> Result<Session, StoreError> {
        let created = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            access_token_hash: session.access_token_hash.clone(),
            refresh_token_hash: session.refresh_token_hash.clone(),
            access_token_expires_at: session.access_token_expires_at,
            refresh_token_expires_at: session.refresh_token_expires_at,
            created_at: Utc::now(),
        };
        self.sessions.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn find_session_by_access_token(&self, access_token_hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.access_token_hash == access_token_hash)
            .cloned())
    }

    async fn find_session_for_refresh(&self, session_id: &Uuid, refresh_token_hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == *session_id && s.refresh_token_hash == refresh_token_hash)
            .cloned())
    }

    async fn delete_session(&self, session_id: &Uuid) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.id != *session_id);
        Ok(before - sessions.len() == 1)
    }

    async fn delete_sessions_for_user(&self, user_id: &Uuid) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.user_id != *user_id);
        Ok((before - sessions.len()) as u64)
    }
}

fn compare_contacts(a: &Contact, b: &Contact, sort_by: ContactSortField) -> Ordering {
    let ordering = match sort_by {
        ContactSortField::Name => a.name.cmp(&b.name),
        ContactSortField::Email => a.email.cmp(&b.email),
        ContactSortField::PhoneNumber => a.phone_number.cmp(&b.phone_number),
        ContactSortField::ContactType => a.contact_type.as_db().cmp(b.contact_type.as_db()),
        ContactSortField::IsFavourite => a.is_favourite.cmp(&b.is_favourite),
        ContactSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        ContactSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    ordering.then_with(|| a.id.cmp(&b.id))
}

#[async_trait::async_trait]
impl ContactRepository for MockRepository {
    async fn create_contact(&self, request: &ContactRequest, user_id: &Uuid) -> Result<Contact, StoreError> {
        let contact = Contact::from_request(request, user_id);
        self.contacts.lock().unwrap().push(contact.clone());
        Ok(contact)
    }

    async fn get_contact_by_id(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<Contact>, StoreError> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == *id && c.user_id == *user_id)
            .cloned())
    }

    async fn list_contacts(&self, query: &ContactQuery, user_id: &Uuid) -> Result<(Vec<Contact>, i64), StoreError> {
        let mut matching: Vec<Contact> = self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == *user_id && query.filter.matches(c))
            .cloned()
            .collect();

        matching.sort_by(|a, b| compare_contacts(a, b, query.sort_by));
        if query.sort_order == SortOrder::Desc {
            matching.reverse();
        }

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.pagination.offset() as usize)
            .take(query.pagination.limit() as usize)
            .collect();

        Ok((page, total))
    }

    async fn update_contact(&self, id: &Uuid, request: &ContactRequest, user_id: &Uuid) -> Result<Option<Contact>, StoreError> {
        let mut contacts = self.contacts.lock().unwrap();
        let Some(contact) = contacts.iter_mut().find(|c| c.id == *id && c.user_id == *user_id) else {
            return Ok(None);
        };

        contact.name = request.name.clone();
        contact.phone_number = request.phone_number.clone();
        contact.email = request.email.clone();
        contact.is_favourite = request.is_favourite;
        contact.contact_type = request.contact_type;
        contact.updated_at = Utc::now();
        Ok(Some(contact.clone()))
    }

    async fn patch_contact(&self, id: &Uuid, patch: &ContactPatchRequest, user_id: &Uuid) -> Result<Option<Contact>, StoreError> {
        let mut contacts = self.contacts.lock().unwrap();
        let Some(contact) = contacts.iter_mut().find(|c| c.id == *id && c.user_id == *user_id) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            contact.name = name.clone();
        }
        if let Some(phone_number) = &patch.phone_number {
            contact.phone_number = phone_number.clone();
        }
        if let Some(email) = &patch.email {
            contact.email = email.clone();
        }
        if let Some(is_favourite) = patch.is_favourite {
            contact.is_favourite = is_favourite;
        }
        if let Some(contact_type) = patch.contact_type {
            contact.contact_type = contact_type;
        }
        contact.updated_at = Utc::now();
        Ok(Some(contact.clone()))
    }

    async fn delete_contact(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, StoreError> {
        let mut contacts = self.contacts.lock().unwrap();
        let before = contacts.len();
        contacts.retain(|c| !(c.id == *id && c.user_id == *user_id));
        Ok(contacts.len() < before)
    }
}
