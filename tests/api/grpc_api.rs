use claim::{assert_none, assert_ok, assert_some};
use tonic::Code;

use crate::helpers::TestApp;
use mailing_list::grpc::proto::{
    CreateEmailRequest, DeleteEmailRequest, EmailEntry, GetEmailBatchRequest, GetEmailRequest,
    UpdateEmailRequest,
};

fn create_request(email: &str) -> CreateEmailRequest {
    CreateEmailRequest {
        email_addr: email.to_string(),
    }
}

fn get_request(email: &str) -> GetEmailRequest {
    GetEmailRequest {
        email_addr: email.to_string(),
    }
}

#[tokio::test]
async fn create_returns_the_stored_entry() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;

    let response = client
        .create_email(create_request("a@example.com"))
        .await
        .expect("CreateEmail failed.")
        .into_inner();

    let entry = assert_some!(response.email_entry);
    assert_ne!(entry.id, 0);
    assert_eq!(entry.email, "a@example.com");
    assert!(!entry.opt_out);
    assert_eq!(entry.confirmed_at, 0);
}

#[tokio::test]
async fn subscriber_lifecycle_create_update_delete() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;

    let created = client
        .create_email(create_request("a@example.com"))
        .await
        .unwrap()
        .into_inner()
        .email_entry
        .unwrap();

    let updated = client
        .update_email(UpdateEmailRequest {
            email_entry: Some(EmailEntry {
                opt_out: true,
                ..created.clone()
            }),
        })
        .await
        .unwrap()
        .into_inner()
        .email_entry
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert!(updated.opt_out);

    let fetched = client
        .get_email(get_request("a@example.com"))
        .await
        .unwrap()
        .into_inner()
        .email_entry
        .unwrap();
    assert!(fetched.opt_out);

    let deleted = client
        .delete_email(DeleteEmailRequest {
            email_addr: String::from("a@example.com"),
        })
        .await
        .expect("DeleteEmail failed.")
        .into_inner();
    assert_none!(deleted.email_entry);

    let after_delete = assert_ok!(client.get_email(get_request("a@example.com")).await);
    assert_none!(after_delete.into_inner().email_entry);
}

#[tokio::test]
async fn confirmation_time_survives_an_update() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;
    let created = client
        .create_email(create_request("a@example.com"))
        .await
        .unwrap()
        .into_inner()
        .email_entry
        .unwrap();

    client
        .update_email(UpdateEmailRequest {
            email_entry: Some(EmailEntry {
                confirmed_at: 1_700_000_000,
                ..created
            }),
        })
        .await
        .unwrap();

    let fetched = client
        .get_email(get_request("a@example.com"))
        .await
        .unwrap()
        .into_inner()
        .email_entry
        .unwrap();
    assert_eq!(fetched.confirmed_at, 1_700_000_000);
    assert!(!fetched.opt_out);
}

#[tokio::test]
async fn unknown_address_returns_an_empty_response() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;

    let response = assert_ok!(client.get_email(get_request("nobody@example.com")).await);

    assert_none!(response.into_inner().email_entry);
}

#[tokio::test]
async fn update_of_unknown_address_does_not_create_it() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;

    let response = client
        .update_email(UpdateEmailRequest {
            email_entry: Some(EmailEntry {
                id: 12,
                email: String::from("ghost@example.com"),
                confirmed_at: 1_700_000_000,
                opt_out: false,
            }),
        })
        .await
        .expect("UpdateEmail failed.")
        .into_inner();
    assert_none!(response.email_entry);

    let lookup = client
        .get_email(get_request("ghost@example.com"))
        .await
        .unwrap()
        .into_inner();
    assert_none!(lookup.email_entry);
}

#[tokio::test]
async fn batches_are_paged_by_id() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;
    for i in 0..5 {
        client
            .create_email(create_request(&format!("subscriber{}@example.com", i)))
            .await
            .unwrap();
    }

    let test_cases = vec![(0, 2, 2), (2, 2, 1), (3, 2, 0)];

    for (page, count, expected) in test_cases {
        let response = client
            .get_email_batch(GetEmailBatchRequest { page, count })
            .await
            .expect("GetEmailBatch failed.")
            .into_inner();

        assert_eq!(
            response.email_entries.len(),
            expected,
            "page {} of size {} returned the wrong number of entries",
            page,
            count
        );
    }

    let first_page = client
        .get_email_batch(GetEmailBatchRequest { page: 0, count: 2 })
        .await
        .unwrap()
        .into_inner();
    let emails: Vec<&str> = first_page
        .email_entries
        .iter()
        .map(|entry| entry.email.as_str())
        .collect();
    assert_eq!(emails, vec!["subscriber0@example.com", "subscriber1@example.com"]);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;

    let invalid_email = client
        .create_email(create_request("example.com"))
        .await
        .unwrap_err();
    let missing_entry = client
        .update_email(UpdateEmailRequest { email_entry: None })
        .await
        .unwrap_err();
    let negative_page = client
        .get_email_batch(GetEmailBatchRequest { page: -1, count: 2 })
        .await
        .unwrap_err();

    assert_eq!(invalid_email.code(), Code::InvalidArgument);
    assert_eq!(missing_entry.code(), Code::InvalidArgument);
    assert_eq!(negative_page.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn duplicate_address_is_reported_as_a_failure() {
    let test_app = TestApp::spawn_app().await;
    let mut client = test_app.grpc_client().await;
    client
        .create_email(create_request("a@example.com"))
        .await
        .unwrap();

    let status = client
        .create_email(create_request("a@example.com"))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unknown);
    assert!(!status.message().is_empty());
}
