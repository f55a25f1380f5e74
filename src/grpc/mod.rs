//! gRPC transport: `MailingListService` on top of the subscriber store.

pub mod convert;

use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::domain::page_request::PageRequest;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_entry::SubscriberEntry;
use crate::store::{StoreError, SubscriberStore};

pub mod proto {
    tonic::include_proto!("mailing_list");
}

use proto::{
    mailing_list_service_server::{MailingListService, MailingListServiceServer},
    CreateEmailRequest, DeleteEmailRequest, EmailEntry, EmailResponse, GetEmailBatchRequest,
    GetEmailBatchResponse, GetEmailRequest, UpdateEmailRequest,
};

/// Store failures reach the caller as-is: no classification, same message.
impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        Status::unknown(err.to_string())
    }
}

pub struct MailingListGrpc {
    store: Arc<dyn SubscriberStore>,
}

impl MailingListGrpc {
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self { store }
    }

    pub fn into_server(self) -> MailingListServiceServer<Self> {
        MailingListServiceServer::new(self)
    }

    /// Looks the address up again; a missing entry is an empty response.
    async fn email_response(&self, email: &str) -> Result<Response<EmailResponse>, Status> {
        // Not-found is not an error on the wire: `email_entry` is left unset.
        let entry = self.store.get_one(email).await?;

        Ok(Response::new(EmailResponse {
            email_entry: entry.as_ref().map(EmailEntry::from),
        }))
    }
}

#[tonic::async_trait]
impl MailingListService for MailingListGrpc {
    #[tracing::instrument(name = "gRPC CreateEmail", skip(self, request))]
    async fn create_email(
        &self,
        request: Request<CreateEmailRequest>,
    ) -> Result<Response<EmailResponse>, Status> {
        let request = request.into_inner();
        tracing::info!("gRPC CreateEmail: {:?}", request);

        // Rejected here so an invalid address never reaches the store.
        let email = SubscriberEmail::parse(request.email_addr).map_err(Status::invalid_argument)?;
        self.store.create(&email).await?;

        self.email_response(email.as_ref()).await
    }

    #[tracing::instrument(name = "gRPC GetEmail", skip(self, request))]
    async fn get_email(
        &self,
        request: Request<GetEmailRequest>,
    ) -> Result<Response<EmailResponse>, Status> {
        let request = request.into_inner();
        tracing::info!("gRPC GetEmail: {:?}", request);

        self.email_response(&request.email_addr).await
    }

    #[tracing::instrument(
        name = "gRPC UpdateEmail",
        skip(self, request),
        fields(email = tracing::field::Empty, confirmed = tracing::field::Empty)
    )]
    async fn update_email(
        &self,
        request: Request<UpdateEmailRequest>,
    ) -> Result<Response<EmailResponse>, Status> {
        let request = request.into_inner();
        tracing::info!("gRPC UpdateEmail: {:?}", request);

        let email_entry = request
            .email_entry
            .ok_or_else(|| Status::invalid_argument("email_entry is required"))?;
        let entry = SubscriberEntry::try_from(email_entry).map_err(Status::invalid_argument)?;
        tracing::Span::current()
            .record("email", entry.email.as_str())
            .record("confirmed", entry.is_confirmed());
        self.store.update(&entry).await?;

        self.email_response(&entry.email).await
    }

    #[tracing::instrument(name = "gRPC DeleteEmail", skip(self, request))]
    async fn delete_email(
        &self,
        request: Request<DeleteEmailRequest>,
    ) -> Result<Response<EmailResponse>, Status> {
        let request = request.into_inner();
        tracing::info!("gRPC DeleteEmail: {:?}", request);

        self.store.delete(&request.email_addr).await?;

        self.email_response(&request.email_addr).await
    }

    #[tracing::instrument(name = "gRPC GetEmailBatch", skip(self, request))]
    async fn get_email_batch(
        &self,
        request: Request<GetEmailBatchRequest>,
    ) -> Result<Response<GetEmailBatchResponse>, Status> {
        let request = request.into_inner();
        tracing::info!("gRPC GetEmailBatch: {:?}", request);

        let page =
            PageRequest::parse(request.page, request.count).map_err(Status::invalid_argument)?;
        let entries = self.store.get_page(page).await?;

        Ok(Response::new(GetEmailBatchResponse {
            email_entries: entries.iter().map(EmailEntry::from).collect(),
        }))
    }
}
