pub mod error;
pub mod filter;
pub mod ledger;
pub mod reconcile;
pub mod schedule;
pub mod service;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod tracker;

pub use crate::error::TrackerError;
pub use crate::filter::{compute_visible, FilterMode, Position, VisibleProjection};
pub use crate::reconcile::{reconcile, Patch, PatchDecision, ReconcileConfig, StorageChange};
pub use crate::service::{TrackerService, TrackerServiceBuilder, Trigger};
