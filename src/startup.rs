use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::error::Error;
use std::net::TcpListener;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tracing_actix_web::TracingLogger;

use crate::config::Settings;
use crate::grpc::MailingListGrpc;
use crate::routes::{
    handle_create_entry, handle_delete_entry, handle_get_entry, handle_get_entry_batch,
    handle_update_entry, health_check,
};
use crate::store::{SqliteStore, StoreError, SubscriberStore};

/// Both listeners plus the store they share.
///
/// Everything that can fail at startup (opening the store, creating the schema,
/// binding either address) happens in [`Application::build`], so a process that
/// got an `Application` serves on both transports or not at all.
pub struct Application {
    json_port: u16,
    grpc_port: u16,
    store: SqliteStore,
    json_server: Server,
    grpc_listener: tokio::net::TcpListener,
    shutdown: CancellationToken,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, StartupError> {
        tracing::info!("Using database '{}'", config.database.get_path());

        let store = SqliteStore::connect(&config.database).await?;

        match Self::start(&config, store.clone()).await {
            Ok(application) => Ok(application),
            Err(err) => {
                store.close().await;
                Err(err)
            }
        }
    }

    async fn start(config: &Settings, store: SqliteStore) -> Result<Self, StartupError> {
        // The schema has to exist before either listener accepts a connection.
        store.create_if_absent().await?;

        let (json_listener, grpc_listener) = bind_listeners(config).await?;
        let json_port = local_port(&config.get_json_address(), json_listener.local_addr())?;
        let grpc_port = local_port(&config.get_grpc_address(), grpc_listener.local_addr())?;
        let json_server = run(json_listener, Arc::new(store.clone()))
            .map_err(StartupError::JsonServerError)?;

        Ok(Self {
            json_port,
            grpc_port,
            store,
            json_server,
            grpc_listener,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn get_json_port(&self) -> u16 {
        self.json_port
    }

    pub fn get_grpc_port(&self) -> u16 {
        self.grpc_port
    }

    /// Cancelling the token stops both listeners and lets
    /// [`Application::run_until_stopped`] return.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serves both transports until both have stopped. If one of them fails the
    /// other is stopped as well and the failure is returned. The store is closed
    /// on every path out of here.
    pub async fn run_until_stopped(self) -> Result<(), StartupError> {
        let Application {
            json_port,
            grpc_port,
            store,
            json_server,
            grpc_listener,
            shutdown,
        } = self;

        let json_handle = json_server.handle();
        tracing::info!("Starting JSON API server on port {}", json_port);
        let json_task = tokio::spawn(json_server);

        tracing::info!("Starting gRPC API server on port {}", grpc_port);
        let grpc_task = tokio::spawn(serve_grpc(
            grpc_listener,
            Arc::new(store.clone()),
            shutdown.clone(),
        ));

        let stop_json = shutdown.clone();
        let json_stopper = tokio::spawn(async move {
            stop_json.cancelled().await;
            json_handle.stop(true).await;
        });

        // try_join! returns on the first listener error without waiting for the
        // other one. Cancelling the token afterwards takes the survivor down.
        let outcome = tokio::try_join!(join_json(json_task), join_grpc(grpc_task));

        shutdown.cancel();
        if let Err(err) = json_stopper.await {
            tracing::warn!("Failed to stop the JSON API server: {:?}", err);
        }
        store.close().await;

        match outcome {
            Ok(_) => {
                tracing::info!("Both API servers stopped");
                Ok(())
            }
            Err(err) => {
                tracing::error!("API server failed: {:?}", err);
                Err(err)
            }
        }
    }
}

/// JSON API server. Signal handling is left to the caller.
pub fn run(
    listener: TcpListener,
    store: Arc<dyn SubscriberStore>,
) -> Result<Server, std::io::Error> {
    let store: web::Data<dyn SubscriberStore> = web::Data::from(store);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/email/create", web::post().to(handle_create_entry))
            .route("/email/get", web::get().to(handle_get_entry))
            .route("/email/update", web::put().to(handle_update_entry))
            .route("/email/delete", web::post().to(handle_delete_entry))
            .route("/email/get_batch", web::get().to(handle_get_entry_batch))
            .app_data(store.clone())
    })
    // Ctrl-C is handled once in main, which cancels the shutdown token for both
    // listeners. Left enabled, actix would stop only the JSON side on SIGINT.
    .disable_signals()
    .listen(listener)?
    .run();

    Ok(server)
}

/// gRPC API server. Returns once `shutdown` is cancelled or the transport fails.
pub async fn serve_grpc(
    listener: tokio::net::TcpListener,
    store: Arc<dyn SubscriberStore>,
    shutdown: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    tonic::transport::Server::builder()
        .trace_fn(|request| tracing::info_span!("gRPC request", path = %request.uri().path()))
        .add_service(MailingListGrpc::new(store).into_server())
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.cancelled().await
        })
        .await
}

async fn bind_listeners(
    config: &Settings,
) -> Result<(TcpListener, tokio::net::TcpListener), StartupError> {
    let json_address = config.get_json_address();
    let json_listener =
        TcpListener::bind(&json_address).map_err(|source| StartupError::BindError {
            address: json_address.clone(),
            source,
        })?;

    // tonic serves from a `TcpListenerStream`, which wraps a tokio listener. Binding
    // it here rather than in the spawned task makes a taken port a startup error.
    let grpc_address = config.get_grpc_address();
    let grpc_listener = tokio::net::TcpListener::bind(&grpc_address)
        .await
        .map_err(|source| StartupError::BindError {
            address: grpc_address.clone(),
            source,
        })?;

    Ok((json_listener, grpc_listener))
}

fn local_port(
    address: &str,
    local_addr: std::io::Result<std::net::SocketAddr>,
) -> Result<u16, StartupError> {
    local_addr
        .map(|local_addr| local_addr.port())
        .map_err(|source| StartupError::BindError {
            address: address.to_string(),
            source,
        })
}

async fn join_json(task: JoinHandle<std::io::Result<()>>) -> Result<(), StartupError> {
    task.await?.map_err(StartupError::JsonServerError)
}

async fn join_grpc(
    task: JoinHandle<Result<(), tonic::transport::Error>>,
) -> Result<(), StartupError> {
    task.await?.map_err(StartupError::GrpcServerError)
}

#[derive(thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    StoreError(#[from] StoreError),
    #[error("Failed to bind {address}.")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON API server error.")]
    JsonServerError(#[source] std::io::Error),
    #[error("gRPC API server error.")]
    GrpcServerError(#[source] tonic::transport::Error),
    #[error("An API server task did not run to completion.")]
    TaskError(#[from] tokio::task::JoinError),
}

impl std::fmt::Debug for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        if let Some(source) = self.source() {
            write!(f, "\nCaused by:\n\t({})", source)?;
        }

        Ok(())
    }
}
