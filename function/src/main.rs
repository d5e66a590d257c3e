use std::sync::Arc;

use function::detector::yolo::YoloDetector;
use function::error::StartupError;
use function::runtime::{self, RuntimeClient};
use function::server;
use function::{DetectionHandler, FunctionConfig, HandlerSettings, SharedDetector};

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match FunctionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            if let Ok(api) = std::env::var("AWS_LAMBDA_RUNTIME_API") {
                RuntimeClient::new(&api)
                    .post_init_error("ConfigError", &e.to_string())
                    .await?;
            }
            return Err(e.into());
        }
    };
    log::info!(
        "model {}, input {}px, conf {}, iou {}",
        config.model_name,
        config.image_size,
        config.thresholds.confidence,
        config.thresholds.iou
    );

    // Loaded on the first request, then kept for the lifetime of the process.
    let model_name = config.model_name.clone();
    let image_size = config.image_size;
    let detector = Arc::new(SharedDetector::lazy(move || {
        YoloDetector::load(&model_name, image_size)
    }));
    let handler = DetectionHandler::new(detector, HandlerSettings::from(&config));

    match config.runtime_api.as_deref() {
        Some(api) => {
            let client = RuntimeClient::new(api);
            runtime::run(&client, &handler).await?;
        }
        None => server::serve(handler, config.port).await?,
    }
    Ok(())
}
