//! Pay-per-click filtering: clicks are matched against CPC campaigns only.

use crate::config::{Config, Topics};
use crate::domain::{Campaign, Click, MatchedClick, Timestamp};
use crate::error::Result;
use crate::format::proto::Proto;
use crate::pipeline::Enrichment;
use crate::stream::join::ValueJoiner;

pub const CLICKS_INPUT_TOPIC: &str = "clicks-input";
pub const CAMPAIGN_INPUT_TOPIC: &str = "campaigns-input";
pub const OUTPUT_TOPIC: &str = "clicks-output";
pub const REKEYED_CLICKS_TOPIC: &str = "rekeyed-clicks";

pub const PAY_PER_CLICK: &str = "CPC";

#[derive(Debug, Clone, Copy, Default)]
pub struct ClickCampaignJoiner;

impl ValueJoiner<Click, Campaign> for ClickCampaignJoiner {
    type Output = MatchedClick;

    fn join(&self, click: &Click, campaign: &Campaign) -> MatchedClick {
        MatchedClick {
            click: Some(click.clone()),
            campaign: Some(campaign.clone()),
            match_timestamp: Some(Timestamp::now()),
        }
    }
}

pub fn campaign_id(click: &Click) -> Option<&str> {
    Some(click.campaign_id.as_str())
}

pub fn is_pay_per_click(_id: &str, campaign: &Campaign) -> bool {
    campaign.cost_type == PAY_PER_CLICK
}

pub type ClickEnrichment =
    Enrichment<Click, Campaign, fn(&Click) -> Option<&str>, ClickCampaignJoiner>;

pub fn topics() -> Topics {
    Topics::new(CLICKS_INPUT_TOPIC, CAMPAIGN_INPUT_TOPIC, OUTPUT_TOPIC).with_debug(REKEYED_CLICKS_TOPIC)
}

pub fn enrichment(topics: Topics) -> ClickEnrichment {
    Enrichment::new(
        "filter-click-pay-events",
        topics,
        campaign_id as fn(&Click) -> Option<&str>,
        is_pay_per_click,
        ClickCampaignJoiner,
    )
}

pub async fn run(cfg: &Config) -> Result<()> {
    enrichment(topics())
        .run_kafka::<Proto<Click>, Proto<Campaign>, Proto<MatchedClick>>(cfg)
        .await
}
