pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::{Config, ProtocolConfig, ShareAccounting};
pub use datasource::{EventSource, JsonlEventSource, MockEventSource, StaticOracle};
pub use domain::{Amount, Decimal, LedgerEvent, TimeMs};
pub use engine::{EngineStats, LedgerEngine, Outcome};
pub use error::{AppError, EngineError};
pub use orchestration::{replay, Ingestor, ReplayReport};
pub use store::{InMemoryStore, Store};
