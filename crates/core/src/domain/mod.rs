pub mod contract;
pub mod mentions;
pub mod metrics;
pub mod report;
pub mod tips;
