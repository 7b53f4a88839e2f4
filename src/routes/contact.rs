use crate::auth::CurrentUser;
use crate::database::SharedRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::contact::{ContactListParams, ContactPatchRequest, ContactQuery, ContactRequest, ContactResponse};
use crate::models::pagination::PaginatedResponse;
use crate::models::response::ApiResponse;
use rocket::response::status::NoContent;
use rocket::{State, delete, get, patch, post, put};
use rocket_okapi::openapi;
use uuid::Uuid;
use validator::Validate;

fn contact_not_found() -> AppError {
    AppError::NotFound("Contact not found".to_string())
}

/// Malformed ids cannot name a contact, so they are reported the same way as missing ones.
fn parse_contact_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| contact_not_found())
}

/// List the caller's contacts with pagination, sorting and filters
#[openapi(tag = "Contacts")]
#[get("/?<params..>")]
pub async fn list_contacts(
    repository: &State<SharedRepository>,
    current_user: CurrentUser,
    params: ContactListParams,
) -> Result<ApiResponse<PaginatedResponse<ContactResponse>>, AppError> {
    let query = ContactQuery::from(&params);
    let (contacts, total) = repository.list_contacts(&query, &current_user.id).await?;
    let data = contacts.iter().map(ContactResponse::from).collect();

    Ok(ApiResponse::ok(
        "Successfully found contacts!",
        PaginatedResponse::new(data, &query.pagination, total),
    ))
}

/// Create a contact owned by the caller
#[openapi(tag = "Contacts")]
#[post("/", data = "<payload>")]
pub async fn create_contact(
    repository: &State<SharedRepository>,
    current_user: CurrentUser,
    payload: JsonBody<ContactRequest>,
) -> Result<ApiResponse<ContactResponse>, AppError> {
    payload.validate()?;

    let contact = repository.create_contact(&payload, &current_user.id).await?;
    Ok(ApiResponse::created("Successfully created a contact!", ContactResponse::from(&contact)))
}

#[openapi(tag = "Contacts")]
#[get("/<id>")]
pub async fn get_contact(repository: &State<SharedRepository>, current_user: CurrentUser, id: &str) -> Result<ApiResponse<ContactResponse>, AppError> {
    let id = parse_contact_id(id)?;
    let contact = repository.get_contact_by_id(&id, &current_user.id).await?.ok_or_else(contact_not_found)?;

    Ok(ApiResponse::ok(
        format!("Successfully found contact with id {}!", id),
        ContactResponse::from(&contact),
    ))
}

/// Replace every field of a contact
#[openapi(tag = "Contacts")]
#[put("/<id>", data = "<payload>")]
pub async fn put_contact(
    repository: &State<SharedRepository>,
    current_user: CurrentUser,
    id: &str,
    payload: JsonBody<ContactRequest>,
) -> Result<ApiResponse<ContactResponse>, AppError> {
    let id = parse_contact_id(id)?;
    payload.validate()?;

    let contact = repository
        .update_contact(&id, &payload, &current_user.id)
        .await?
        .ok_or_else(contact_not_found)?;

    Ok(ApiResponse::ok("Successfully updated a contact!", ContactResponse::from(&contact)))
}

/// Update only the fields present in the body
#[openapi(tag = "Contacts")]
#[patch("/<id>", data = "<payload>")]
pub async fn patch_contact(
    repository: &State<SharedRepository>,
    current_user: CurrentUser,
    id: &str,
    payload: JsonBody<ContactPatchRequest>,
) -> Result<ApiResponse<ContactResponse>, AppError> {
    let id = parse_contact_id(id)?;
    payload.validate()?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("Request body must contain at least one field".to_string()));
    }

    let contact = repository
        .patch_contact(&id, &payload, &current_user.id)
        .await?
        .ok_or_else(contact_not_found)?;

    Ok(ApiResponse::ok("Successfully patched a contact!", ContactResponse::from(&contact)))
}

#[openapi(tag = "Contacts")]
#[delete("/<id>")]
pub async fn delete_contact(repository: &State<SharedRepository>, current_user: CurrentUser, id: &str) -> Result<NoContent, AppError> {
    let id = parse_contact_id(id)?;
    if !repository.delete_contact(&id, &current_user.id).await? {
        return Err(contact_not_found());
    }

    Ok(NoContent)
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_contacts, create_contact, get_contact, put_contact, patch_contact, delete_contact]
}
