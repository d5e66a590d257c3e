mod common;

use actix_web::{App, test, web};
use common::{ScriptedDetector, encoded_png, handler};
use function::server::configure_routes;
use serde_json::{Value, json};

#[actix_web::test]
async fn invoke_route_returns_the_envelope() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(handler(ScriptedDetector::street_scene())))
            .configure(configure_routes::<ScriptedDetector>),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/invoke")
        .set_json(json!({ "image": encoded_png(24, 24) }))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["statusCode"], 200);
    assert_eq!(resp["body"]["summary"]["total_detections"], 3);
    assert!(resp["body"]["annotatedImage"].is_string());
    assert!(resp["body"]["timings"]["phases"]["yolo_total"]["phases"]["inference"].is_number());
}

#[actix_web::test]
async fn handler_errors_still_answer_http_200() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(handler(ScriptedDetector::broken())))
            .configure(configure_routes::<ScriptedDetector>),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/invoke")
        .set_json(json!({ "image": encoded_png(8, 8) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["body"]["type"], "InferenceError");
}

#[actix_web::test]
async fn health_reports_ok() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(handler(ScriptedDetector::street_scene())))
            .configure(configure_routes::<ScriptedDetector>),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp, json!({ "status": "ok" }));
}
