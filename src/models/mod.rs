pub mod loaders;
pub mod stats;
pub mod vehicle;

pub use loaders::load_config;
pub use stats::{CheckpointState, RunStatistics, StopReason};
pub use vehicle::{fields, RawRecord, VehicleRecord};
