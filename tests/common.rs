#![allow(dead_code)]

use kstream::domain::{Campaign, Click, Device, Timestamp, User};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn click(id: &str, campaign_id: &str) -> Click {
    Click {
        id: id.to_string(),
        device_id: format!("{}-device", id),
        campaign_id: campaign_id.to_string(),
        impression_id: format!("{}-impression", id),
        timestamp: Some(Timestamp {
            seconds: 1_700_000_000,
            nanos: 0,
        }),
    }
}

pub fn campaign(id: &str, cost_type: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        advertiser_id: "advertiser".to_string(),
        product_id: "product".to_string(),
        cost: 0.42,
        cost_type: cost_type.to_string(),
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

pub fn device(id: &str, kind: &str, user_id: &str) -> Device {
    Device {
        id: id.to_string(),
        kind: kind.to_string(),
        user_id: user_id.to_string(),
    }
}
