//! Core domain types: snipe tasks, campaigns, and the event surface the
//! UI/store collaborator consumes.

pub mod campaign;
pub mod task;

pub use campaign::{Campaign, CampaignMode, CampaignStats, CampaignStatus, StopCondition};
pub use task::{
    BuyOutcome, DetectedLaunch, EventSink, GasOverrides, LaunchTask, LogEntry, LogLevel,
    SnipeEvent, SnipeWallet, TaskStatus,
};
