#![deny(unused_must_use)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate async_trait;

pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod metrics;
pub mod pipeline;
pub mod pipelines;

pub mod task;
pub mod table;
pub mod stream;
pub mod store;

pub use config::{Config, Topics};
pub use error::{Error, Result};
pub use metrics::{Counter, JoinMetrics};
pub use pipeline::Enrichment;
pub use stream::{KSink, KStream, Record};
pub use table::{KTable, MaterializedTable};
pub use store::KVStore;
