use chrono::{DateTime, Utc};
use regex::Regex;
use rocket::FromForm;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::pagination::PaginationParams;

static PHONE_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("phone pattern is a valid regex"));

static PHONE_FILTER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?\d{10,15}$").expect("phone filter pattern is a valid regex"));

fn validate_phone_number(phone_number: &str) -> Result<(), ValidationError> {
    if PHONE_NUMBER_REGEX.is_match(phone_number) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_number"))
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Work,
    Home,
    #[default]
    Personal,
}

impl ContactType {
    pub const ALL: [ContactType; 3] = [ContactType::Work, ContactType::Home, ContactType::Personal];

    pub fn as_db(&self) -> &'static str {
        match self {
            ContactType::Work => "work",
            ContactType::Home => "home",
            ContactType::Personal => "personal",
        }
    }
}

impl FromStr for ContactType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ContactType::ALL
            .into_iter()
            .find(|contact_type| contact_type.as_db() == value)
            .ok_or_else(|| format!("unknown contact type: {}", value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub is_favourite: bool,
    pub contact_type: ContactType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[validate(length(min = 3, max = 30, message = "Name should have between 3 and 30 characters"))]
    pub name: String,
    #[validate(custom(function = "validate_phone_number", message = "Phone number must be in format +XXXXXXXXXXX"))]
    #[schemars(regex(pattern = r"^\+?[1-9]\d{1,14}$"))]
    pub phone_number: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    pub is_favourite: bool,
    #[serde(default)]
    pub contact_type: ContactType,
}

#[derive(Deserialize, Debug, Clone, Default, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatchRequest {
    #[validate(length(min = 3, max = 30, message = "Name should have between 3 and 30 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_phone_number", message = "Phone number must be in format +XXXXXXXXXXX"))]
    #[schemars(regex(pattern = r"^\+?[1-9]\d{1,14}$"))]
    pub phone_number: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub is_favourite: Option<bool>,
    pub contact_type: Option<ContactType>,
}

impl ContactPatchRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone_number.is_none() && self.email.is_none() && self.is_favourite.is_none() && self.contact_type.is_none()
    }
}

#[derive(Serialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub is_favourite: bool,
    pub contact_type: ContactType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Contact> for ContactResponse {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name.clone(),
            phone_number: contact.phone_number.clone(),
            email: contact.email.clone(),
            is_favourite: contact.is_favourite,
            contact_type: contact.contact_type,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactSortField {
    Name,
    Email,
    PhoneNumber,
    ContactType,
    IsFavourite,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl ContactSortField {
    /// Unknown fields (including the legacy `_id`) fall back to creation order.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "name" => ContactSortField::Name,
            "email" => ContactSortField::Email,
            "phoneNumber" => ContactSortField::PhoneNumber,
            "contactType" => ContactSortField::ContactType,
            "isFavourite" => ContactSortField::IsFavourite,
            "updatedAt" => ContactSortField::UpdatedAt,
            _ => ContactSortField::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            ContactSortField::Name => "name",
            ContactSortField::Email => "email",
            ContactSortField::PhoneNumber => "phone_number",
            ContactSortField::ContactType => "contact_type",
            ContactSortField::IsFavourite => "is_favourite",
            ContactSortField::CreatedAt => "created_at",
            ContactSortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFilter {
    pub contact_type: Option<ContactType>,
    pub is_favourite: Option<bool>,
    pub phone_number: Option<String>,
    /// Case-insensitive substring of the contact name
    pub name: Option<String>,
}

#[cfg(test)]
impl ContactFilter {
    pub fn matches(&self, contact: &Contact) -> bool {
        self.contact_type.is_none_or(|contact_type| contact.contact_type == contact_type)
            && self.is_favourite.is_none_or(|is_favourite| contact.is_favourite == is_favourite)
            && self.phone_number.as_deref().is_none_or(|phone| contact.phone_number == phone)
            && self
                .name
                .as_deref()
                .is_none_or(|name| contact.name.to_lowercase().contains(&name.to_lowercase()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactQuery {
    pub pagination: PaginationParams,
    pub sort_by: ContactSortField,
    pub sort_order: SortOrder,
    pub filter: ContactFilter,
}

/// Raw list query string. Every value is optional and parsed leniently:
/// anything unparseable falls back to its default or is ignored.
#[derive(FromForm, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactListParams {
    pub page: Option<String>,
    #[field(name = "perPage")]
    pub per_page: Option<String>,
    #[field(name = "sortBy")]
    pub sort_by: Option<String>,
    #[field(name = "sortOrder")]
    pub sort_order: Option<String>,
    #[field(name = "contactType")]
    pub contact_type: Option<String>,
    #[field(name = "isFavourite")]
    pub is_favourite: Option<String>,
    #[field(name = "phoneNumber")]
    pub phone_number: Option<String>,
    pub name: Option<String>,
}

fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

fn parse_is_favourite(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_phone_number(value: &str) -> Option<String> {
    let cleaned = value.trim();
    PHONE_FILTER_REGEX.is_match(cleaned).then(|| cleaned.to_string())
}

fn parse_name(value: &str) -> Option<String> {
    let cleaned = value.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

impl From<&ContactListParams> for ContactQuery {
    fn from(params: &ContactListParams) -> Self {
        Self {
            pagination: PaginationParams::new(parse_number(params.page.as_deref()), parse_number(params.per_page.as_deref())),
            sort_by: params.sort_by.as_deref().map(ContactSortField::parse).unwrap_or_default(),
            sort_order: params.sort_order.as_deref().map(SortOrder::parse).unwrap_or_default(),
            filter: ContactFilter {
                contact_type: params.contact_type.as_deref().and_then(|v| v.trim().parse().ok()),
                is_favourite: params.is_favourite.as_deref().and_then(parse_is_favourite),
                phone_number: params.phone_number.as_deref().and_then(parse_phone_number),
                name: params.name.as_deref().and_then(parse_name),
            },
        }
    }
}
