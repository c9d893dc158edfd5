//! Record shapes of the packaged pipelines.

pub mod ads;
pub mod devices;

pub use ads::{Campaign, Click, MatchedClick, Timestamp};
pub use devices::{Device, User, UserDeviceDetails};
