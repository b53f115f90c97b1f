//! Campaign execution: recurring pump/dump rounds plus the on-chain
//! market-cap probe their stop conditions consult.

pub mod marketcap;
pub mod scheduler;

pub use marketcap::{MarketCapProbe, ProbeError};
pub use scheduler::CampaignScheduler;
