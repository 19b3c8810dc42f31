pub mod planner;

#[cfg(test)]
mod props;

pub use planner::{AllocationPlan, AllocationPlanner, AllocationRecord, SkipReason};
