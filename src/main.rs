use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use payflow::Config;
use payflow::acquirer::reconcile::{RefundSweeper, TimeoutReaper};
use payflow::acquirer::{AcquiringBank, Notifier};
use payflow::csv::{read_submissions, write_payments};
use payflow::gateway::{Gateway, InMemoryPaymentRepository, Resync};
use payflow::worker::{Sweep, Workers};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment requests CSV file
    input: PathBuf,

    /// Seconds between timeout reaper sweeps
    #[arg(long, default_value_t = 10)]
    timeout_interval_secs: u64,

    /// Seconds between refund sweeps
    #[arg(long, default_value_t = 10)]
    refund_interval_secs: u64,

    /// Seconds between gateway resync passes
    #[arg(long, default_value_t = 5)]
    resync_interval_secs: u64,

    /// Seconds an unanswered 3-D Secure challenge stays open
    #[arg(long, default_value_t = 60)]
    challenge_ttl_secs: u64,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            timeout_interval: Duration::from_secs(self.timeout_interval_secs),
            refund_interval: Duration::from_secs(self.refund_interval_secs),
            resync_interval: Duration::from_secs(self.resync_interval_secs),
            challenge_ttl: Duration::from_secs(self.challenge_ttl_secs),
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    if cli.input.extension().is_none_or(|ext| ext != "csv") {
        warn!(path = %cli.input.display(), "input file seems to not be a csv file");
    }

    let submissions = match read_submissions(&cli.input) {
        Ok(submissions) => submissions,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let (notifier, mut events) = Notifier::channel();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(payment = %event.id, hook_url = ?event.hook_url, "notification delivered");
        }
    });

    let bank = Arc::new(AcquiringBank::new(&config, notifier));
    let repository = Arc::new(InMemoryPaymentRepository::new());
    let gateway = Arc::new(Gateway::new(Arc::clone(&bank), repository));

    let mut workers = Workers::new();
    workers.spawn(
        TimeoutReaper::new(Arc::clone(&bank), config.challenge_ttl),
        config.timeout_interval,
    );
    workers.spawn(RefundSweeper::new(Arc::clone(&bank)), config.refund_interval);
    workers.spawn(Resync::new(Arc::clone(&gateway)), config.resync_interval);

    let (sender, receiver) = tokio::sync::mpsc::channel(16);
    tokio::spawn(async move {
        for result in submissions {
            match result {
                Ok(submission) => {
                    if sender.send(submission).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    gateway.run(ReceiverStream::new(receiver)).await;
    workers.shutdown().await;

    // settle: let the bank issue pending refunds, then mirror everything once more
    RefundSweeper::new(Arc::clone(&bank)).sweep(Utc::now());
    gateway.resync();

    let payments = match gateway.payments() {
        Ok(payments) => payments,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let views: Vec<_> = payments.iter().map(|payment| payment.view()).collect();

    if let Err(e) = write_payments(io::stdout().lock(), &views) {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
