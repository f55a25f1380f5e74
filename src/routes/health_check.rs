use actix_web::HttpResponse;

/// Liveness probe for the HTTP listener. It does not touch the store.
#[tracing::instrument(name = "Health check")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
