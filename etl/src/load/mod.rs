//! Incremental loading: watermark resolution and the per table load decisions.

pub mod controller;
pub mod watermark;

pub use controller::{
    FullLoadReason, LoadController, RunReport, TableLoadPhase, TableLoadPhaseType,
    TableLoadReport, UpdateColumnMap,
};
pub use watermark::{Clock, FixedClock, SystemClock, WatermarkResolver};
