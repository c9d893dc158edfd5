//! Ready-made pipelines over the domain records.

pub mod clicks;
pub mod devices;
pub mod shout;
