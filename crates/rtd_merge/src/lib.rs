//! rtd_merge — fetch a JSON payload with one HTTP POST, wrap it in a fixed
//! template and write the pretty-printed result to a sink.
//!
//! # Pipeline
//!
//! ```text
//! Source::get_stream ──► read to end ──► Merger::get_merged ──► sink.write_all
//!   (HTTP POST)          (in memory)      (validate, splice,      (stdout, buffer,
//!                                          re-indent)               file)
//! ```
//!
//! Each stage fails with its own [`AppError`] variant and the run stops
//! there; nothing is retried and nothing partial is written.

pub mod app;
pub mod config;
pub mod error;
pub mod merge;
pub mod source;

pub use app::App;
pub use config::{build_app, PipelineConfig};
pub use error::{AppError, ConfigError, MergeError, SourceError, TemplateError};
pub use merge::{JsonTemplateMerger, Merger};
pub use source::{BodyReader, HttpPostSource, Source};
pub use tokio_util::sync::CancellationToken;
