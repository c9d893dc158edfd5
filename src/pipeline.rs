use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::{Config, Topics};
use crate::error::Result;
use crate::format::{Format, Str};
use crate::metrics::JoinMetrics;
use crate::stream::join::ValueJoiner;
use crate::stream::topic::{EventConsumer, TypedConsumer, TypedProducer};
use crate::stream::{KSink, KStream};
use crate::table::{Admission, MaterializedTable};
use crate::task::Task;

/// Stream-table enrichment: events are re-keyed by a foreign key, optionally
/// tapped to a debug feed, and joined against the latest admitted entity of
/// the reference feed.
///
/// The reference side and the event side are separate chains sharing one
/// table. They can be run together with [`Enrichment::run`] or separately,
/// e.g. to warm the table before replaying events.
pub struct Enrichment<E, R, F, J> {
    name: String,
    topics: Topics,
    foreign_key: F,
    joiner: J,
    table: Arc<MaterializedTable<R>>,
    metrics: Arc<JoinMetrics>,
    _event: PhantomData<fn(&E)>,
}

impl<E, R, F, J> Enrichment<E, R, F, J>
where
    R: Send + Sync + 'static,
    F: Fn(&E) -> Option<&str>,
    J: ValueJoiner<E, R>,
{
    pub fn new(
        name: &str,
        topics: Topics,
        foreign_key: F,
        admission: impl Admission<R> + 'static,
        joiner: J,
    ) -> Self {
        let metrics = Arc::new(JoinMetrics::new());
        let table = MaterializedTable::new(&topics.reference)
            .with_admission(admission)
            .with_metrics(metrics.clone());
        Enrichment {
            name: name.to_string(),
            topics,
            foreign_key,
            joiner,
            table: Arc::new(table),
            metrics,
            _event: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn table(&self) -> &Arc<MaterializedTable<R>> {
        &self.table
    }

    pub fn metrics(&self) -> &Arc<JoinMetrics> {
        &self.metrics
    }

    /// Feeds the reference stream into the table until it ends.
    pub async fn run_reference<S>(&self, reference: S) -> Result<()>
    where
        S: KStream<Key = String, Value = R>,
    {
        Task::new(Config::default(), &format!("{}-table", self.name))
            .with_metrics(self.metrics.clone())
            .source(reference)
            .table(self.table.clone())
            .run()
            .await
    }

    /// Re-keys, taps and joins the event stream until it ends.
    pub async fn run_events<S, O, D>(&self, events: S, output: O, debug: Option<D>) -> Result<()>
    where
        S: KStream<Value = E>,
        O: KSink<Key = String, Value = J::Output>,
        D: KSink<Key = String, Value = E>,
    {
        Task::new(Config::default(), &self.name)
            .with_metrics(self.metrics.clone())
            .source(events)
            .rekey(&self.foreign_key)
            .through_opt(debug)
            .join(self.table.clone(), &self.joiner)
            .sink(output)
            .await
    }

    /// Runs both sides concurrently. The first error stops both; a poisoned
    /// table is reported before it is returned.
    pub async fn run<SE, SR, O, D>(&self, events: SE, reference: SR, output: O, debug: Option<D>) -> Result<()>
    where
        SE: KStream<Value = E>,
        SR: KStream<Key = String, Value = R>,
        O: KSink<Key = String, Value = J::Output>,
        D: KSink<Key = String, Value = E>,
    {
        info!("{}: starting with {:?}", self.name, self.topics);
        let res = futures::try_join!(
            self.run_reference(reference),
            self.run_events(events, output, debug)
        );
        match &res {
            Err(e) if e.is_fatal() => error!("{}: halting: {}", self.name, e),
            Err(e) => warn!("{}: stopped: {}", self.name, e),
            Ok(_) => info!("{}: finished {:?}", self.name, self.metrics.snapshot()),
        }
        res.map(|_| ())
    }

    /// Runs against Kafka with string keys and the given value formats.
    pub async fn run_kafka<EF, RF, OF>(&self, cfg: &Config) -> Result<()>
    where
        EF: Format<Item = E>,
        RF: Format<Item = R>,
        OF: Format<Item = J::Output>,
    {
        self.topics.validate()?;

        // Events are re-keyed from their payload, so their record key may be absent.
        let events = EventConsumer::<Str, EF>::new(
            &cfg.clone().set_group(&format!("{}-events", self.name)),
            &self.topics.events,
            self.metrics.clone(),
        )?;
        // The table is rebuilt from the start of the reference feed.
        let reference = TypedConsumer::<Str, RF>::new(
            &cfg
                .clone()
                .set_group(&format!("{}-reference", self.name))
                .set("auto.offset.reset", "earliest"),
            &self.topics.reference,
            self.metrics.clone(),
        )?;
        let output = TypedProducer::<Str, OF>::new(cfg, &self.topics.output)?;
        let debug = match &self.topics.debug {
            Some(topic) => Some(TypedProducer::<Str, EF>::new(cfg, topic)?),
            None => None,
        };

        self.run(events, reference, output, debug).await
    }
}
