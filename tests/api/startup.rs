use std::net::TcpListener;
use std::time::Duration;

use crate::helpers::test_config;
use mailing_list::startup::{Application, StartupError};

#[tokio::test]
async fn cancelling_the_shutdown_token_stops_both_servers() {
    let db_dir = tempfile::tempdir().unwrap();
    let application = Application::build(test_config(&db_dir))
        .await
        .expect("Failed to build application.");
    let shutdown = application.shutdown_token();
    let running = tokio::spawn(application.run_until_stopped());

    shutdown.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .expect("Servers did not stop in time.")
        .expect("Server task panicked.");
    assert!(outcome.is_ok(), "{:?}", outcome);
}

#[tokio::test]
async fn busy_grpc_address_is_fatal() {
    let db_dir = tempfile::tempdir().unwrap();
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config(&db_dir);
    config.set_grpc_address(taken.local_addr().unwrap().to_string());

    let result = Application::build(config).await;

    assert!(matches!(result, Err(StartupError::BindError { .. })));
}

#[tokio::test]
async fn busy_json_address_is_fatal() {
    let db_dir = tempfile::tempdir().unwrap();
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config(&db_dir);
    config.set_json_address(taken.local_addr().unwrap().to_string());

    let result = Application::build(config).await;

    assert!(matches!(result, Err(StartupError::BindError { .. })));
}

#[tokio::test]
async fn unreachable_database_is_fatal() {
    let db_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&db_dir);
    config.set_db_path(
        db_dir
            .path()
            .join("missing")
            .join("list.db")
            .to_string_lossy()
            .into_owned(),
    );

    let result = Application::build(config).await;

    assert!(matches!(result, Err(StartupError::StoreError(_))));
}
