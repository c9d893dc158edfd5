use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Timestamp {
    pub fn now() -> Self {
        // A clock before 1970 is treated as the epoch itself.
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp {
            seconds: since.as_secs() as i64,
            nanos: 0,
        }
    }
}

/// Ad click, keyed by `id` on the input topic and joined on `campaign_id`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Click {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub device_id: String,
    #[prost(string, tag = "3")]
    pub campaign_id: String,
    #[prost(string, tag = "4")]
    pub impression_id: String,
    #[prost(message, optional, tag = "5")]
    pub timestamp: Option<Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Campaign {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub advertiser_id: String,
    #[prost(string, tag = "3")]
    pub product_id: String,
    #[prost(double, tag = "4")]
    pub cost: f64,
    /// Pricing model, e.g. `CPC` or `CPM`.
    #[prost(string, tag = "5")]
    pub cost_type: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MatchedClick {
    #[prost(message, optional, tag = "1")]
    pub click: Option<Click>,
    #[prost(message, optional, tag = "2")]
    pub campaign: Option<Campaign>,
    #[prost(message, optional, tag = "3")]
    pub match_timestamp: Option<Timestamp>,
}
