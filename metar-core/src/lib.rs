//! Core library for the `metar` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The upstream report provider (CheckWX decoded METAR/TAF)
//! - A TTL cache shared by both report kinds
//! - Debounced input handling and the view coordinator that reconciles
//!   in-flight fetches with the latest airport code
//!
//! It is used by `metar-cli`, but can also be reused by other front ends.

pub mod cache;
pub mod category;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod fetcher;
pub mod model;
pub mod provider;
pub mod report;
pub mod session;

pub use cache::{CacheStore, FileStore, MemoryStore, TtlCache};
pub use category::{FlightCategory, classify};
pub use config::Config;
pub use coordinator::{Phase, Snapshot, ViewCoordinator, ViewMode};
pub use fetcher::{FetchError, MetarFetcher, ResourceFetcher, TafFetcher};
pub use model::{AirportCode, CacheKey, ErrorKind, FetchState, ResourceKind};
pub use provider::{CheckWxProvider, ReportSource};
pub use report::{ForecastRecord, MetarRecord};
pub use session::{Command, SessionHandle, SessionOptions};
