//! # Kronicle Core
//!
//! Client SDK for the Kronicle time-series service.
//!
//! ## Overview
//!
//! - **Resilient connector** with bounded retries on transport failures
//! - **Typed payloads** validated when they are decoded
//! - **Channel directory** cached until the next mutating call
//! - **Kronicable samples**: caller record types checked against the schema
//!   vocabulary and turned into rows
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Single-slot directory cache |
//! | [`config`] | Connector settings and environment overrides |
//! | [`connector`] | Request execution, response parsing, directory queries |
//! | [`connectors`] | Reader, writer and setup roles |
//! | [`domain`] | Payload, schema, identifier and timestamp types |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`kronicable`] | Sample type declarations and classification |
//! | [`retry`] | Retry budget and sleeper |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kronicle_core::{DataFormat, KronicleReader};
//!
//! let mut reader = KronicleReader::new("http://127.0.0.1:8000");
//! if let Some(best) = reader.get_channel_with_max_rows()? {
//!     let id = best.sensor_id.expect("listed channels carry an id");
//!     let rows = reader.get_rows_for_channel(&id, DataFormat::Frame)?;
//!     println!("{rows:?}");
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ KronicleReader / Writer /    │
//! │ Setup (role façades)         │
//! └──────────────┬───────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────┐     ┌──────────────────┐
//! │ KronicleConnector            │────▶│ DirectoryCache   │
//! │ (verbs, retries, parsing)    │     └──────────────────┘
//! └──────────────┬───────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────┐
//! │ HttpClient (reqwest/blocking)│
//! └──────────────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! use kronicle_core::{KronicleError, KronicleSetup};
//!
//! let mut setup = KronicleSetup::new("http://127.0.0.1:8000");
//! match setup.delete_channel(&id) {
//!     Ok(_) => {}
//!     Err(KronicleError::Operation { message, .. }) => eprintln!("nothing to delete: {message}"),
//!     Err(KronicleError::Http(error)) => eprintln!("server refused: {error}"),
//!     Err(KronicleError::Connection { attempts, .. }) => eprintln!("gave up after {attempts} attempts"),
//!     Err(other) => eprintln!("{other}"),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod connector;
pub mod connectors;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod kronicable;
pub mod retry;

pub use cache::DirectoryCache;
pub use config::ConnectorConfig;
pub use connector::{
    parse_response, slash_join, Body, ChannelRowCount, ConnectorRole, KronicleConnector,
    KronicleResponse,
};
pub use connectors::{
    KronicleReader, KronicleSetup, KronicleWriter, ReaderRoutes, SetupRoutes, WriteRole,
    WriterRoutes,
};
pub use domain::*;
pub use error::{KronicleError, KronicleHttpError, ValidationError};
pub use http_client::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient, TransportError,
    TransportErrorKind,
};
pub use kronicable::{
    classify, ElementKind, FieldDecl, FieldType, KronicableSample, RecordShape, SampleType,
    TypeDescriptor,
};
pub use retry::{RetryBudget, Sleeper, ThreadSleeper};
