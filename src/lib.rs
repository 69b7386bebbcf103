//! # Netcool Forwarder
//!
//! A Sensu handler that normalizes check results into Netcool-style alerts
//! and forwards them to an SQS FIFO queue.
//!
//! One invocation processes exactly one event: the check output is split
//! into lines, each line is classified against an ordered rule list, and
//! every alertable line becomes one normalized record published with a
//! deterministic deduplication id.
//!
//! ## Example
//!
//! ```rust,no_run
//! use netcool_forwarder::{HandlerConfig, MonitoringEvent, QueueClient, MESSAGE_GROUP_ID};
//! use std::time::Duration;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let event = MonitoringEvent::from_json(r#"{
//!         "entity": {"metadata": {"name": "web01.example.com"}},
//!         "check": {
//!             "metadata": {"name": "check-disk"},
//!             "interval": 300,
//!             "occurrences": 1,
//!             "output": "FSUsage WARN: / 9.5% usage | /,9.5,4,,SysAut,Major"
//!         }
//!     }"#)?;
//!
//!     let client = QueueClient::new(
//!         Url::parse("https://sqs.eu-west-1.amazonaws.com")?,
//!         "https://sqs.eu-west-1.amazonaws.com/123/alerts.fifo",
//!         Duration::from_secs(10),
//!         None,
//!     )?;
//!
//!     for record in netcool_forwarder::process_event(&event, &HandlerConfig::default()) {
//!         let body = record.encoded_body()?;
//!         let receipt = client
//!             .publish(&body, MESSAGE_GROUP_ID, record.dedup_id())
//!             .await?;
//!         println!("{}", receipt.message_id);
//!     }
//!     Ok(())
//! }
//! ```

mod classify;
mod errors;
mod event;
mod queue;
mod record;
mod severity;
mod template;

pub use classify::{classify_line, CheckContext, CheckState, ClassifiedLine, LineKind};
pub use errors::{ForwarderError, Result};
pub use event::MonitoringEvent;
pub use queue::{PublishReceipt, QueueClient};
pub use record::{process_event, AlertRecord, HandlerConfig, MESSAGE_GROUP_ID};
pub use severity::{resolve_level, Severity, ALWAYS_NOTIFY_TYPES, CLEARING_TRAP_LEVEL};
pub use template::{render, TemplateFields, TemplateTable, DEFAULT_TEMPLATE};
