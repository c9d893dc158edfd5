use bytes::Bytes;
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext, Rebalance};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::ClientContext;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::format::Format;
use crate::metrics::{Counter, JoinMetrics};
use crate::stream::{KSink, KStream, Record};
use crate::Config;

pub struct Context {
    topic: String,
}

impl ClientContext for Context {}

impl ConsumerContext for Context {
    fn post_rebalance(&self, rebalance: &Rebalance<'_>) {
        match rebalance {
            Rebalance::Assign(parts) => {
                info!("{}: assigned {} partitions", self.topic, parts.count());
            }
            Rebalance::Revoke(_) => {
                info!("{}: partitions revoked", self.topic);
            }
            _ => {
                warn!("{}: rebalance failed", self.topic);
            }
        }
    }
}

/// Undecoded record as read from the broker.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub key: Option<Bytes>,
    pub payload: Option<Bytes>,
    pub partition: i32,
    pub offset: i64,
}

pub struct RawConsumer {
    topic: String,
    base: BaseConsumer<Context>,
}

impl RawConsumer {
    pub fn new(config: &Config, topic: &str) -> Result<Self> {
        let context = Context {
            topic: topic.to_string(),
        };
        let consumer: BaseConsumer<Context> = config.0.create_with_context(context)?;
        consumer.subscribe(&[topic])?;
        Ok(Self {
            topic: topic.to_string(),
            base: consumer,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn poll_next(&mut self) -> Result<RawRecord> {
        loop {
            if let Some(msg) = self.base.poll(Duration::ZERO) {
                let message = msg?;
                return Ok(RawRecord {
                    key: message.key().map(Bytes::copy_from_slice),
                    payload: message.payload().map(Bytes::copy_from_slice),
                    partition: message.partition(),
                    offset: message.offset(),
                });
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

/// Decodes raw records with a key and a value [`Format`].
///
/// Payloads that fail to decode are counted as malformed and yield `None`.
/// A missing record key is not an error here; consumers decide whether they
/// need one.
pub struct Decoder<KF, VF> {
    topic: String,
    metrics: Arc<JoinMetrics>,
    _marker: PhantomData<(KF, VF)>,
}

impl<KF: Format, VF: Format> Decoder<KF, VF> {
    pub fn new(topic: &str, metrics: Arc<JoinMetrics>) -> Self {
        Decoder {
            topic: topic.to_string(),
            metrics,
            _marker: PhantomData,
        }
    }

    pub fn decode(&self, raw: &RawRecord) -> Option<Record<Option<KF::Item>, VF::Item>> {
        let key = match raw.key.as_deref().map(KF::deserialize).transpose() {
            Ok(k) => k,
            Err(e) => {
                self.malformed(raw, &e);
                return None;
            }
        };
        let value = match raw.payload.as_deref().map(VF::deserialize).transpose() {
            Ok(v) => v,
            Err(e) => {
                self.malformed(raw, &e);
                return None;
            }
        };
        Some(Record {
            key,
            value,
            partition: raw.partition,
            offset: raw.offset,
        })
    }

    fn malformed(&self, raw: &RawRecord, reason: &dyn std::fmt::Display) {
        warn!(
            "{}: dropping record {}/{}: {}",
            self.topic, raw.partition, raw.offset, reason
        );
        self.metrics.incr(Counter::Malformed);
    }
}

/// Kafka topic decoded with a key and a value [`Format`]. Every record must
/// carry a key; keyless records are malformed and skipped.
///
/// The stream never ends on its own.
pub struct TypedConsumer<KF, VF> {
    pub(crate) raw: RawConsumer,
    pub(crate) decoder: Decoder<KF, VF>,
}

impl<KF: Format, VF: Format> TypedConsumer<KF, VF> {
    pub fn new(config: &Config, topic: &str, metrics: Arc<JoinMetrics>) -> Result<Self> {
        Ok(TypedConsumer {
            raw: RawConsumer::new(config, topic)?,
            decoder: Decoder::new(topic, metrics),
        })
    }
}

#[async_trait(?Send)]
impl<KF, VF> KStream for TypedConsumer<KF, VF>
where
    KF: Format,
    VF: Format,
{
    type Key = KF::Item;
    type Value = VF::Item;

    async fn next(&mut self) -> Result<Option<Record<Self::Key, Self::Value>>> {
        loop {
            let raw = self.raw.poll_next().await?;
            match self.decoder.decode(&raw) {
                Some(Record {
                    key: Some(key),
                    value,
                    partition,
                    offset,
                }) => {
                    return Ok(Some(Record {
                        key,
                        value,
                        partition,
                        offset,
                    }))
                }
                Some(_) => self.decoder.malformed(&raw, &"record has no key"),
                None => {}
            }
        }
    }
}

/// Kafka topic whose record keys are optional, for feeds that are re-keyed
/// from their payload anyway.
pub struct EventConsumer<KF, VF> {
    pub(crate) raw: RawConsumer,
    pub(crate) decoder: Decoder<KF, VF>,
}

impl<KF: Format, VF: Format> EventConsumer<KF, VF> {
    pub fn new(config: &Config, topic: &str, metrics: Arc<JoinMetrics>) -> Result<Self> {
        Ok(EventConsumer {
            raw: RawConsumer::new(config, topic)?,
            decoder: Decoder::new(topic, metrics),
        })
    }
}

#[async_trait(?Send)]
impl<KF, VF> KStream for EventConsumer<KF, VF>
where
    KF: Format,
    VF: Format,
{
    type Key = Option<KF::Item>;
    type Value = VF::Item;

    async fn next(&mut self) -> Result<Option<Record<Self::Key, Self::Value>>> {
        loop {
            let raw = self.raw.poll_next().await?;
            if let Some(rec) = self.decoder.decode(&raw) {
                return Ok(Some(rec));
            }
        }
    }
}

pub struct RawProducer {
    topic: String,
    base: FutureProducer,
}

impl RawProducer {
    pub fn new(config: &Config, topic: &str) -> Result<Self> {
        let base: FutureProducer = config.0.create()?;
        Ok(RawProducer {
            topic: topic.to_string(),
            base,
        })
    }

    pub async fn send(&mut self, part: Option<i32>, key: Bytes, payload: Option<Bytes>) -> Result<()> {
        let mut rec: FutureRecord<[u8], [u8]> = FutureRecord::to(&self.topic).key(&key[..]);
        rec.payload = payload.as_deref();
        rec.partition = part;

        self.base
            .send(rec, Timeout::Never)
            .await
            .map(|_| ())
            .map_err(|(e, _)| Error::Kafka(e))
    }
}

pub struct TypedProducer<KF, VF> {
    pub(crate) raw: RawProducer,
    pub(crate) _marker: PhantomData<(KF, VF)>,
}

impl<KF, VF> TypedProducer<KF, VF> {
    pub fn new(config: &Config, topic: &str) -> Result<Self> {
        Ok(RawProducer::new(config, topic)?.into())
    }
}

impl<KF, VF> From<RawProducer> for TypedProducer<KF, VF> {
    fn from(p: RawProducer) -> Self {
        Self {
            raw: p,
            _marker: PhantomData,
        }
    }
}

#[async_trait(?Send)]
impl<KF, VF> KSink for TypedProducer<KF, VF>
where
    KF: Format,
    VF: Format,
{
    type Key = KF::Item;
    type Value = VF::Item;

    async fn send_next(&mut self, part: Option<i32>, k: &Self::Key, v: Option<&Self::Value>) -> Result<()> {
        let key = KF::serialize(k)?;
        let payload = v.map(VF::serialize).transpose()?;
        self.raw.send(part, key, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Click;
    use crate::format::json::JSON;
    use crate::format::proto::Proto;
    use crate::format::Str;
    use prost::Message as _;

    fn raw(key: Option<&[u8]>, payload: Option<&[u8]>) -> RawRecord {
        RawRecord {
            key: key.map(Bytes::copy_from_slice),
            payload: payload.map(Bytes::copy_from_slice),
            partition: 0,
            offset: 11,
        }
    }

    #[test]
    fn bad_json_is_malformed() {
        let metrics = Arc::new(JoinMetrics::new());
        let decoder = Decoder::<Str, JSON<crate::domain::Device>>::new("devices", metrics.clone());

        assert!(decoder.decode(&raw(Some(b"D1"), Some(b"{\"id\": 4"))).is_none());
        assert_eq!(metrics.get(Counter::Malformed), 1);
    }

    #[test]
    fn bad_protobuf_is_malformed() {
        let metrics = Arc::new(JoinMetrics::new());
        let decoder = Decoder::<Str, Proto<Click>>::new("clicks-input", metrics.clone());

        // Field 1 claims 100 bytes of string but the buffer ends.
        assert!(decoder.decode(&raw(Some(b"E1"), Some(&[0x0a, 0x64, b'x']))).is_none());
        assert!(decoder.decode(&raw(Some(&[0xff]), Some(b""))).is_none());
        assert_eq!(metrics.get(Counter::Malformed), 2);
    }

    #[test]
    fn keyless_record_keeps_its_payload() {
        let metrics = Arc::new(JoinMetrics::new());
        let decoder = Decoder::<Str, Proto<Click>>::new("clicks-input", metrics.clone());
        let click = Click {
            id: "E1".into(),
            campaign_id: "C1".into(),
            ..Default::default()
        };

        let rec = decoder.decode(&raw(None, Some(&click.encode_to_vec()))).unwrap();
        assert_eq!(rec.key, None);
        assert_eq!(rec.value, Some(click));
        assert_eq!(rec.offset, 11);
        assert_eq!(metrics.get(Counter::Malformed), 0);
    }

    #[test]
    fn tombstone_decodes_to_empty_value() {
        let decoder = Decoder::<Str, JSON<crate::domain::User>>::new("users", Default::default());
        let rec = decoder.decode(&raw(Some(b"U1"), None)).unwrap();
        assert_eq!(rec.key.as_deref(), Some("U1"));
        assert!(rec.value.is_none());
    }
}
