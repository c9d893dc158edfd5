use crate::config::Config;
use crate::error::Result;
use crate::format::Str;
use crate::stream::topic::{TypedConsumer, TypedProducer};
use crate::stream::{KSink, KStream};
use crate::task::Task;

pub const INPUT_TOPIC: &str = "shout-input";
pub const OUTPUT_TOPIC: &str = "shout-output";

/// Upper-cases every value, keeping keys.
pub async fn shout<S, O>(cfg: Config, source: S, sink: O) -> Result<()>
where
    S: KStream<Value = String>,
    O: KSink<Key = S::Key, Value = String>,
{
    Task::new(cfg, "shout")
        .source(source)
        .peek(|rec| debug!("input event -> {}/{}", rec.partition, rec.offset))
        .map(|_, v: String| v.to_uppercase())
        .sink(sink)
        .await
}

pub async fn run(cfg: &Config) -> Result<()> {
    let source = TypedConsumer::<Str, Str>::new(
        &cfg.clone().set_group("shout"),
        INPUT_TOPIC,
        Default::default(),
    )?;
    let sink = TypedProducer::<Str, Str>::new(cfg, OUTPUT_TOPIC)?;
    shout(cfg.clone(), source, sink).await
}
