mod common;

use common::*;

use kstream::domain::{Click, MatchedClick};
use kstream::pipelines::clicks::{self, CAMPAIGN_INPUT_TOPIC, CLICKS_INPUT_TOPIC, OUTPUT_TOPIC, REKEYED_CLICKS_TOPIC};
use kstream::stream::memory::{self, MemorySink, MemorySource};
use kstream::table::Upsert;
use kstream::Counter;

fn sinks() -> (MemorySink<String, MatchedClick>, MemorySink<String, Click>) {
    (MemorySink::new(OUTPUT_TOPIC), MemorySink::new(REKEYED_CLICKS_TOPIC))
}

#[tokio::test]
async fn cpc_campaign_is_matched() {
    init();
    let pipeline = clicks::enrichment(clicks::topics());
    let (output, debug) = sinks();

    let campaigns = MemorySource::from_records(
        CAMPAIGN_INPUT_TOPIC,
        vec![("C1".to_string(), campaign("C1", "CPC"))],
    );
    pipeline.run_reference(campaigns).await.unwrap();

    let events = MemorySource::from_records(CLICKS_INPUT_TOPIC, vec![("E1".to_string(), click("E1", "C1"))]);
    pipeline
        .run_events(events, output.clone(), Some(debug.clone()))
        .await
        .unwrap();

    let matched = output.read_key_values();
    assert_eq!(matched.len(), 1);
    let (key, m) = &matched[0];
    assert_eq!(key, "C1");
    assert_eq!(m.click.as_ref().unwrap().id, "E1");
    assert_eq!(m.campaign.as_ref().unwrap().id, "C1");
    assert!(m.match_timestamp.is_some());

    assert_eq!(debug.read_key_values(), vec![("C1".to_string(), click("E1", "C1"))]);
}

#[tokio::test]
async fn non_cpc_campaign_is_filtered_but_tapped() {
    init();
    let pipeline = clicks::enrichment(clicks::topics());
    let (output, debug) = sinks();

    let campaigns = MemorySource::from_records(
        CAMPAIGN_INPUT_TOPIC,
        vec![("C2".to_string(), campaign("C2", "CPM"))],
    );
    pipeline.run_reference(campaigns).await.unwrap();
    assert!(pipeline.table().lookup("C2").unwrap().is_none());

    let events = MemorySource::from_records(CLICKS_INPUT_TOPIC, vec![("E2".to_string(), click("E2", "C2"))]);
    pipeline
        .run_events(events, output.clone(), Some(debug.clone()))
        .await
        .unwrap();

    assert!(output.is_empty());
    assert_eq!(debug.len(), 1);
    let snap = pipeline.metrics().snapshot();
    assert_eq!(snap.rejected, 1);
    assert_eq!(snap.missed, 1);
    assert_eq!(snap.tapped, 1);
}

#[tokio::test]
async fn early_click_is_lost_until_replayed() {
    init();
    let pipeline = clicks::enrichment(clicks::topics());
    let (output, debug) = sinks();

    let early = vec![("E3".to_string(), click("E3", "C3"))];
    pipeline
        .run_events(
            MemorySource::from_records(CLICKS_INPUT_TOPIC, early.clone()),
            output.clone(),
            Some(debug.clone()),
        )
        .await
        .unwrap();
    assert!(output.is_empty());

    assert_eq!(
        pipeline.table().upsert("C3", campaign("C3", "CPC")).unwrap(),
        Upsert::Inserted
    );
    // The campaign is there now, but nothing retroactively joins.
    assert!(pipeline.table().lookup("C3").unwrap().is_some());
    assert!(output.is_empty());

    // Replaying the feed against the warm table is the caller's job.
    pipeline
        .run_events(
            MemorySource::from_records(CLICKS_INPUT_TOPIC, early),
            output.clone(),
            Some(debug.clone()),
        )
        .await
        .unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(debug.len(), 2);
}

#[tokio::test]
async fn campaign_downgrade_keeps_serving_cpc_version() {
    init();
    let pipeline = clicks::enrichment(clicks::topics());
    let (output, _) = sinks();

    let mut cheaper = campaign("C1", "CPC");
    cheaper.cost = 0.10;
    let campaigns = MemorySource::from_records(
        CAMPAIGN_INPUT_TOPIC,
        vec![
            ("C1".to_string(), campaign("C1", "CPC")),
            ("C1".to_string(), cheaper),
            ("C1".to_string(), campaign("C1", "CPM")),
        ],
    );
    pipeline.run_reference(campaigns).await.unwrap();

    let events = MemorySource::from_records(CLICKS_INPUT_TOPIC, vec![("E1".to_string(), click("E1", "C1"))]);
    pipeline
        .run_events(events, output.clone(), None::<MemorySink<String, Click>>)
        .await
        .unwrap();

    let m = &output.read_values()[0];
    let resident = m.campaign.as_ref().unwrap();
    assert_eq!(resident.cost_type, "CPC");
    assert_eq!(resident.cost, 0.10);
}

#[tokio::test]
async fn malformed_clicks_are_counted_apart_from_misses() {
    init();
    let pipeline = clicks::enrichment(clicks::topics());
    let (output, debug) = sinks();

    let events = MemorySource::from_records(
        CLICKS_INPUT_TOPIC,
        vec![
            ("E1".to_string(), click("E1", "")),
            ("E2".to_string(), click("E2", "C-unknown")),
        ],
    );
    pipeline
        .run_events(events, output.clone(), Some(debug.clone()))
        .await
        .unwrap();

    let snap = pipeline.metrics().snapshot();
    assert_eq!(snap.malformed, 1);
    assert_eq!(snap.missed, 1);
    assert_eq!(snap.rekeyed, 1);
    // Malformed events never reach the tap.
    assert_eq!(debug.read_key_values()[0].0, "C-unknown");
    assert_eq!(debug.len(), 1);
    assert!(output.is_empty());
}

#[tokio::test]
async fn live_feeds_share_one_table() {
    init();
    let pipeline = clicks::enrichment(clicks::topics());
    let (output, debug) = sinks();

    let (mut campaigns, reference) = memory::topic(CAMPAIGN_INPUT_TOPIC);
    let (mut clicks_in, events) = memory::topic(CLICKS_INPUT_TOPIC);

    let driver = async {
        campaigns
            .pipe_input("C1".to_string(), campaign("C1", "CPC"))
            .unwrap();
        while pipeline.table().lookup("C1").unwrap().is_none() {
            tokio::task::yield_now().await;
        }
        clicks_in.pipe_input("E1".to_string(), click("E1", "C1")).unwrap();
        clicks_in.pipe_input("E2".to_string(), click("E2", "C9")).unwrap();
        clicks_in.pipe_input("E3".to_string(), click("E3", "C1")).unwrap();
        drop(clicks_in);
        drop(campaigns);
    };

    let (res, _) = tokio::join!(
        pipeline.run(events, reference, output.clone(), Some(debug.clone())),
        driver
    );
    res.unwrap();

    let ids: Vec<String> = output
        .read_values()
        .into_iter()
        .map(|m| m.click.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["E1".to_string(), "E3".to_string()]);
    assert_eq!(debug.len(), 3);
    assert_eq!(pipeline.metrics().get(Counter::Matched), 2);
    assert_eq!(pipeline.metrics().get(Counter::Missed), 1);
}
