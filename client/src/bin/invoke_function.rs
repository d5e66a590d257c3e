//! invoke_function - Send one image to the detection function and print the
//! timing breakdown, detections and summary.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use client::cli::TargetArgs;
use client::invoke::save_annotated_image;
use client::transport::Transport;
use client::{Invoker, report};

#[derive(Parser, Debug)]
#[command(
    name = "invoke_function",
    about = "Invoke the detection function once and show where the time went"
)]
struct Args {
    #[command(flatten)]
    target: TargetArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    let args = Args::parse();

    let request = args.target.request()?;
    let transport = args
        .target
        .connect()
        .await
        .context("failed to set up transport")?;
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Invoking {} with {}",
        transport.describe(),
        args.target.image.display()
    )?;

    let invoker = Invoker::new(transport);
    let outcome = match invoker.invoke(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            report::render_failure(&mut io::stderr(), &e)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    writeln!(stdout)?;
    report::render_invocation(&mut stdout, &outcome)?;

    if let Some(path) = &args.target.save_result {
        save_annotated_image(&outcome.body.annotated_image, path)?;
        writeln!(stdout, "\nAnnotated image saved to {}", path.display())?;
    }
    Ok(ExitCode::SUCCESS)
}
