#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(warnings)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
//! # s3-notify-runtime
//!
//! A small custom runtime for serverless functions that react to S3 event
//! notifications. It speaks the host's runtime API directly: poll for the
//! next invocation, decode the payload without a fixed schema, hand it to a
//! handler, and report success or a structured error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use s3_notify_runtime::{processor_fn, FunctionMetadata, Runtime, RuntimeConfig, S3SnsEventHandler};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> s3_notify_runtime::Result<()> {
//! let handler = S3SnsEventHandler::new(processor_fn(|record, ctx| {
//!     ctx.logger().log(&format!("would thumbnail {}/{}\n", record.bucket, record.key));
//!     Ok(())
//! }));
//!
//! let runtime = Runtime::builder(handler)
//!     .config(RuntimeConfig::from_env()?)
//!     .metadata(FunctionMetadata::from_env())
//!     .build()?;
//!
//! runtime.run().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Event shapes
//!
//! - [`S3EventHandler`]: S3 notifications delivered straight to the function.
//! - [`S3SnsEventHandler`]: S3 notifications relayed through an SNS topic,
//!   where each SNS message carries a JSON-encoded S3 notification.
//!
//! Field names are matched case-insensitively and unknown fields are ignored
//! in both.

pub mod config;
pub mod context;
pub mod errors;
pub mod event;
pub mod handler;
pub mod outcome;
pub mod runtime;
pub mod transport;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use config::{FunctionMetadata, HandlerKind, RuntimeConfig};
pub use context::{DynLogSink, InvocationContext, LogSink, MemorySink, StdoutSink};
pub use errors::{Result, RuntimeError};
pub use event::{DecodedEvent, EventDecoder, Node, S3ObjectEvent, SnsEvent};
pub use handler::{
    processor_fn, FnProcessor, Handler, NoopProcessor, RecordProcessor, S3EventHandler,
    S3SnsEventHandler,
};
pub use outcome::{ErrorReport, OutcomeReport};
pub use runtime::{CompletedInvocation, Runtime, RuntimeBuilder};
#[cfg(feature = "reqwest-transport")]
pub use transport::HttpRuntimeApi;
pub use transport::{DynRuntimeApi, InvocationRequest, RuntimeApi};
