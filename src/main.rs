use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use url::Url;

use netcool_forwarder::{
    process_event, HandlerConfig, MonitoringEvent, QueueClient, MESSAGE_GROUP_ID,
};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(
    name = "netcool-forwarder",
    version,
    about = "Normalize a Sensu check result and forward alerts to an SQS FIFO queue"
)]
struct Opts {
    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,

    #[arg(short, long, help = "Test mode: do not stamp environment as prod")]
    test: bool,

    #[arg(long, help = "Full URL of the SQS queue to post to")]
    queue_url: String,

    #[arg(
        long,
        help = "Queue service endpoint (defaults to the origin of the queue URL)"
    )]
    endpoint: Option<Url>,

    #[arg(long, help = "Proxy to communicate with APIs through, as host:port")]
    proxy: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opts = Opts::parse();

    let default_level = if opts.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    if opts.verbose {
        debug!("Enabled debug logging");
    }

    match run(opts).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(opts: Opts) -> Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read event from stdin")?;

    let event = MonitoringEvent::from_json(&input)?;

    let config = HandlerConfig {
        test_mode: opts.test,
    };
    let records = process_event(&event, &config);
    if records.is_empty() {
        debug!("No alertable lines in check output");
        return Ok(());
    }

    let endpoint = match opts.endpoint {
        Some(endpoint) => endpoint,
        None => endpoint_of(&opts.queue_url)?,
    };
    let client = QueueClient::new(
        endpoint,
        opts.queue_url,
        PUBLISH_TIMEOUT,
        opts.proxy.as_deref(),
    )?;

    for record in records {
        let body = record.encoded_body()?;
        let receipt = client
            .publish(&body, MESSAGE_GROUP_ID, record.dedup_id())
            .await
            .with_context(|| format!("Failed to publish alert {}", record.alert_key))?;
        println!("{}", receipt.message_id);
        println!("{}", receipt.body_md5);
    }

    Ok(())
}

/// The service endpoint is the queue URL with its path cleared.
fn endpoint_of(queue_url: &str) -> Result<Url> {
    let mut url: Url = queue_url
        .parse()
        .with_context(|| format!("Invalid queue URL: {queue_url}"))?;
    url.set_path("/");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_all_flags() {
        let opts = Opts::parse_from([
            "netcool-forwarder",
            "--verbose",
            "--test",
            "--queue-url",
            "https://sqs.eu-west-1.amazonaws.com/123/alerts.fifo",
            "--proxy",
            "proxy.example.com:3128",
        ]);
        assert!(opts.verbose);
        assert!(opts.test);
        assert_eq!(opts.proxy.as_deref(), Some("proxy.example.com:3128"));
        assert!(opts.endpoint.is_none());
    }

    #[test]
    fn test_endpoint_defaults_to_queue_origin() {
        let endpoint = endpoint_of("https://sqs.eu-west-1.amazonaws.com/123/alerts.fifo").unwrap();
        assert_eq!(endpoint.as_str(), "https://sqs.eu-west-1.amazonaws.com/");
    }

    #[test]
    fn test_invalid_queue_url_is_an_error() {
        assert!(endpoint_of("not a url").is_err());
    }
}
