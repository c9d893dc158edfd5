//! Device/user enrichment: every device ping gets its owner's profile.

use crate::config::{Config, Topics};
use crate::domain::{Device, User, UserDeviceDetails};
use crate::error::Result;
use crate::format::json::JSON;
use crate::pipeline::Enrichment;
use crate::stream::join::ValueJoiner;
use crate::table::AdmitAll;

pub const DEVICES_TOPIC: &str = "devices";
pub const USERS_TOPIC: &str = "users";
pub const OUTPUT_TOPIC: &str = "user-device-matched";
pub const REKEYED_DEVICES_TOPIC: &str = "rekeyed-devices";

#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceUserJoiner;

impl ValueJoiner<Device, User> for DeviceUserJoiner {
    type Output = UserDeviceDetails;

    fn join(&self, device: &Device, user: &User) -> UserDeviceDetails {
        UserDeviceDetails {
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            user_name: user.name.clone(),
            device_id: device.id.clone(),
            device_type: device.kind.clone(),
        }
    }
}

pub fn user_id(device: &Device) -> Option<&str> {
    Some(device.user_id.as_str())
}

pub type DeviceEnrichment = Enrichment<Device, User, fn(&Device) -> Option<&str>, DeviceUserJoiner>;

pub fn topics() -> Topics {
    Topics::new(DEVICES_TOPIC, USERS_TOPIC, OUTPUT_TOPIC).with_debug(REKEYED_DEVICES_TOPIC)
}

pub fn enrichment(topics: Topics) -> DeviceEnrichment {
    Enrichment::new(
        "device-user-enricher",
        topics,
        user_id as fn(&Device) -> Option<&str>,
        AdmitAll,
        DeviceUserJoiner,
    )
}

pub async fn run(cfg: &Config) -> Result<()> {
    enrichment(topics())
        .run_kafka::<JSON<Device>, JSON<User>, JSON<UserDeviceDetails>>(cfg)
        .await
}
