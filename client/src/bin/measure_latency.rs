//! measure_latency - Invoke the detection function repeatedly and report
//! per-phase averages with the cold start excluded.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use client::cli::TargetArgs;
use client::invoke::save_annotated_image;
use client::measure::DEFAULT_RUNS;
use client::transport::Transport;
use client::{Invoker, report, run_measurements};

#[derive(Parser, Debug)]
#[command(
    name = "measure_latency",
    about = "Measure detection latency over repeated invocations"
)]
struct Args {
    #[command(flatten)]
    target: TargetArgs,

    /// Total invocations, including the cold start
    #[arg(short = 'n', long, default_value_t = DEFAULT_RUNS as u64,
          value_parser = clap::value_parser!(u64).range(2..))]
    runs: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    let args = Args::parse();
    let runs = usize::try_from(args.runs).context("--runs is too large")?;

    let request = args.target.request()?;
    let transport = args
        .target
        .connect()
        .await
        .context("failed to set up transport")?;
    println!(
        "Measuring {} over {} run(s) with {}\n",
        transport.describe(),
        runs,
        args.target.image.display()
    );

    let invoker = Invoker::new(transport);
    let outcome = run_measurements(&invoker, &request, runs, |progress| {
        report::emit_progress(&mut io::stdout().lock(), &progress);
    })
    .await;

    let mut stdout = io::stdout().lock();
    writeln!(stdout)?;
    if !report::render_measurement(&mut stdout, &outcome)? {
        return Ok(ExitCode::FAILURE);
    }

    if let (Some(path), Some(body)) = (&args.target.save_result, &outcome.last_body) {
        save_annotated_image(&body.annotated_image, path)?;
        writeln!(stdout, "\nAnnotated image from the last run saved to {}", path.display())?;
    }
    Ok(ExitCode::SUCCESS)
}
