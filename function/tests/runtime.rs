mod common;

use std::sync::Mutex;

use actix_web::{App, HttpResponse, HttpServer, web};
use common::{ScriptedDetector, encoded_png, handler};
use function::runtime::{RuntimeClient, serve_next};
use serde_json::{Value, json};

/// What the fake Runtime API received from the function.
#[derive(Default)]
struct Posted {
    responses: Mutex<Vec<(String, Value)>>,
    errors: Mutex<Vec<(String, String, Value)>>,
}

struct FakeRuntime {
    event: Vec<u8>,
    posted: Posted,
}

async fn next(state: web::Data<FakeRuntime>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("Lambda-Runtime-Aws-Request-Id", "req-0001"))
        .insert_header(("Lambda-Runtime-Deadline-Ms", "4102444800000"))
        .body(state.event.clone())
}

async fn response(
    state: web::Data<FakeRuntime>,
    id: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    state
        .posted
        .responses
        .lock()
        .unwrap()
        .push((id.into_inner(), body.into_inner()));
    HttpResponse::Accepted().finish()
}

async fn error(
    state: web::Data<FakeRuntime>,
    req: actix_web::HttpRequest,
    id: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    let error_type = req
        .headers()
        .get("Lambda-Runtime-Function-Error-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state
        .posted
        .errors
        .lock()
        .unwrap()
        .push((id.into_inner(), error_type, body.into_inner()));
    HttpResponse::Accepted().finish()
}

async fn run_one(event: Vec<u8>, detector: ScriptedDetector) -> web::Data<FakeRuntime> {
    let state = web::Data::new(FakeRuntime {
        event,
        posted: Posted::default(),
    });

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(16 * 1024 * 1024))
            .route("/2018-06-01/runtime/invocation/next", web::get().to(next))
            .route(
                "/2018-06-01/runtime/invocation/{id}/response",
                web::post().to(response),
            )
            .route(
                "/2018-06-01/runtime/invocation/{id}/error",
                web::post().to(error),
            )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let server_handle = server.handle();
    actix_web::rt::spawn(server);

    let client = RuntimeClient::new(&addr.to_string());
    serve_next(&client, &handler(detector)).await.unwrap();

    server_handle.stop(true).await;
    state
}

#[actix_web::test]
async fn answers_an_invocation_through_the_runtime_api() {
    let event = serde_json::to_vec(&json!({ "image": encoded_png(16, 16) })).unwrap();
    let state = run_one(event, ScriptedDetector::street_scene()).await;

    let responses = state.posted.responses.lock().unwrap();
    assert_eq!(responses.len(), 1);
    let (id, body) = &responses[0];
    assert_eq!(id, "req-0001");
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["body"]["summary"]["total_detections"], 3);
    assert!(state.posted.errors.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn handler_failures_are_posted_as_responses() {
    let event = serde_json::to_vec(&json!({ "image": "###" })).unwrap();
    let state = run_one(event, ScriptedDetector::street_scene()).await;

    let responses = state.posted.responses.lock().unwrap();
    assert_eq!(responses[0].1["statusCode"], 400);
    assert_eq!(responses[0].1["body"]["type"], "DecodeError");
}

#[actix_web::test]
async fn non_json_event_is_reported_as_an_invocation_error() {
    let state = run_one(b"not json at all".to_vec(), ScriptedDetector::street_scene()).await;

    assert!(state.posted.responses.lock().unwrap().is_empty());
    let errors = state.posted.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "req-0001");
    assert_eq!(errors[0].1, "Unhandled");
    assert_eq!(errors[0].2["errorType"], "InvalidEvent");
}
