use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::domain::page_request::PageRequest;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_entry::SubscriberEntry;
use crate::store::{StoreError, SubscriberStore};

#[derive(Deserialize, Debug)]
pub struct EmailBody {
    pub email: String,
}

#[tracing::instrument(
    name = "JSON CreateEmail",
    skip(body, store),
    fields(email = %body.email)
)]
pub async fn handle_create_entry(
    body: web::Json<EmailBody>,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, EntryApiError> {
    tracing::info!("JSON CreateEmail: {:?}", body);

    let email = SubscriberEmail::parse(body.into_inner().email)
        .map_err(EntryApiError::ValidationError)?;
    store.create(&email).await?;

    entry_response(store.get_ref(), email.as_ref()).await
}

#[tracing::instrument(
    name = "JSON GetEmail",
    skip(query, store),
    fields(email = %query.email)
)]
pub async fn handle_get_entry(
    query: web::Query<EmailBody>,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, EntryApiError> {
    tracing::info!("JSON GetEmail: {:?}", query);

    entry_response(store.get_ref(), &query.email).await
}

#[tracing::instrument(
    name = "JSON UpdateEmail",
    skip(body, store),
    fields(email = %body.email, confirmed = body.is_confirmed())
)]
pub async fn handle_update_entry(
    body: web::Json<SubscriberEntry>,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, EntryApiError> {
    tracing::info!("JSON UpdateEmail: {:?}", body);

    let entry = body.into_inner();
    store.update(&entry).await?;

    entry_response(store.get_ref(), &entry.email).await
}

#[tracing::instrument(
    name = "JSON DeleteEmail",
    skip(body, store),
    fields(email = %body.email)
)]
pub async fn handle_delete_entry(
    body: web::Json<EmailBody>,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, EntryApiError> {
    tracing::info!("JSON DeleteEmail: {:?}", body);

    store.delete(&body.email).await?;

    entry_response(store.get_ref(), &body.email).await
}

#[tracing::instrument(
    name = "JSON GetEmailBatch",
    skip(query, store),
    fields(page = %query.page, count = %query.count)
)]
pub async fn handle_get_entry_batch(
    query: web::Query<PageRequest>,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, EntryApiError> {
    tracing::info!("JSON GetEmailBatch: {:?}", query);

    let entries = store.get_page(query.into_inner()).await?;

    Ok(HttpResponse::Ok().json(entries))
}

/// Not found is a regular answer: the body is `null`.
async fn entry_response(
    store: &dyn SubscriberStore,
    email: &str,
) -> Result<HttpResponse, EntryApiError> {
    let entry = store.get_one(email).await?;

    Ok(HttpResponse::Ok().json(entry))
}

#[derive(thiserror::Error)]
pub enum EntryApiError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to reach the subscriber store.")]
    StoreError(#[from] StoreError),
}

impl std::fmt::Debug for EntryApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryApiError::ValidationError(_) => write!(f, "Caused by:\n\t({})", self),
            EntryApiError::StoreError(err) => write!(f, "{}\n{:?}", self, err),
        }
    }
}

impl ResponseError for EntryApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            EntryApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            EntryApiError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
