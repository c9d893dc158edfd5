use rdkafka::config::RDKafkaLogLevel;
use rdkafka::ClientConfig;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config(pub(crate) ClientConfig);

impl Config {
    pub fn new() -> Config {
        Config(ClientConfig::new())
    }

    pub fn set(mut self, key: &str, value: &str) -> Config {
        self.0.set(key, value);
        self
    }

    pub fn set_group(self, group: &str) -> Config {
        self.set("group.id", group)
    }

    pub fn set_log_level(mut self, log_level: RDKafkaLogLevel) -> Config {
        self.0.set_log_level(log_level);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// Names of the four logical feeds of an enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topics {
    pub events: String,
    pub reference: String,
    pub output: String,
    /// Where rekeyed events are republished before the join. `None` disables the tap.
    #[serde(default)]
    pub debug: Option<String>,
}

impl Topics {
    pub fn new(events: &str, reference: &str, output: &str) -> Self {
        Topics {
            events: events.to_string(),
            reference: reference.to_string(),
            output: output.to_string(),
            debug: None,
        }
    }

    pub fn with_debug(mut self, debug: &str) -> Self {
        self.debug = Some(debug.to_string());
        self
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let topics: Topics = serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        topics.validate()?;
        Ok(topics)
    }

    pub fn validate(&self) -> Result<()> {
        let named = [
            ("events", Some(&self.events)),
            ("reference", Some(&self.reference)),
            ("output", Some(&self.output)),
            ("debug", self.debug.as_ref()),
        ];
        for (feed, name) in named {
            if let Some(name) = name {
                if name.trim().is_empty() {
                    return Err(Error::Config(format!("{} topic name is empty", feed)));
                }
            }
        }
        if self.events == self.output || self.reference == self.output {
            return Err(Error::Config(format!(
                "output topic '{}' must differ from the input topics",
                self.output
            )));
        }
        if let Some(debug) = &self.debug {
            if [&self.events, &self.reference, &self.output].contains(&debug) {
                return Err(Error::Config(format!(
                    "debug topic '{}' must differ from the other feeds",
                    debug
                )));
            }
        }
        Ok(())
    }
}
