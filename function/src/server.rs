//! Local HTTP front for the handler, used outside Lambda.
//!
//! `POST /invoke` takes the same event JSON as the deployed function and
//! answers with the same `{statusCode, body}` envelope (HTTP status is always 200).

use actix_web::{App, Error, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::detector::Detector;
use crate::handler::DetectionHandler;

const MAX_EVENT_BYTES: usize = 16 * 1024 * 1024;

pub fn configure_routes<D: Detector + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_EVENT_BYTES))
        .service(web::resource("/invoke").route(web::post().to(invoke::<D>)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn invoke<D: Detector + 'static>(
    handler: web::Data<DetectionHandler<D>>,
    event: web::Json<Value>,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    log::info!("local invocation {}", request_id);

    let handler = handler.into_inner();
    let event = event.into_inner();
    let response = web::block(move || handler.handle(event)).await?;

    log::info!(
        "local invocation {} finished with status {}",
        request_id,
        response.status_code
    );
    Ok(HttpResponse::Ok().json(response))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn serve<D: Detector + 'static>(
    handler: DetectionHandler<D>,
    port: u16,
) -> std::io::Result<()> {
    let handler = web::Data::new(handler);
    let bind_address = format!("0.0.0.0:{}", port);
    log::info!("Starting local function server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(handler.clone())
            .configure(configure_routes::<D>)
    })
    .workers(1)
    .bind(&bind_address)?
    .run()
    .await
}
