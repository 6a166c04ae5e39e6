//! Connector roles.
//!
//! | Role | Prefix | Alias | Adds |
//! |------|--------|-------|------|
//! | [`ReaderRoutes`] | `data/v1` | [`KronicleReader`] | nothing beyond the shared queries |
//! | [`WriterRoutes`] | `data/v1` | [`KronicleWriter`] | row ingestion |
//! | [`SetupRoutes`] | `setup/v1` | [`KronicleSetup`] | row ingestion and channel lifecycle |

mod reader;
mod setup;
mod writer;

pub use reader::{KronicleReader, ReaderRoutes};
pub use setup::{KronicleSetup, SetupRoutes};
pub use writer::{KronicleWriter, WriteRole, WriterRoutes};
