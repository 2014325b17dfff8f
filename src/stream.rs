//! Streaming watch responses

use crate::model::{Kind, Model};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read};
use tracing::trace;

/// Consumer of a streamed response body
///
/// [`Repository::stream`](crate::Repository::stream) hands the live body to the
/// parser and returns once `parse` does.
pub trait StreamingParser {
    fn parse(&mut self, body: &mut dyn Read) -> Result<()>;
}

/// One watch notification
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchEvent {
    /// `ADDED`, `MODIFIED`, `DELETED`, `BOOKMARK` or `ERROR`
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub object: Value,
}

impl WatchEvent {
    /// The event object as a model of kind `K`
    pub fn model<K: Kind>(&self) -> Result<Model<K>> {
        Model::from_value(self.object.clone())
    }
}

/// Parser for line-delimited JSON watch events
///
/// Each non-blank line is decoded into a [`WatchEvent`] and handed to the
/// handler; a handler error stops the parse.
pub struct JsonLinesParser<F> {
    handler: F,
    events: usize,
}

impl<F> JsonLinesParser<F>
where
    F: FnMut(WatchEvent) -> Result<()>,
{
    pub fn new(handler: F) -> Self {
        Self { handler, events: 0 }
    }

    /// Number of events handled so far
    pub fn events(&self) -> usize {
        self.events
    }
}

impl<F> StreamingParser for JsonLinesParser<F>
where
    F: FnMut(WatchEvent) -> Result<()>,
{
    fn parse(&mut self, body: &mut dyn Read) -> Result<()> {
        for line in BufReader::new(body).lines() {
            let line = line.map_err(|e| Error::Transport {
                code: 500,
                message: format!("Failed to read watch stream: {}", e),
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event: WatchEvent = serde_json::from_str(line)
                .map_err(|e| Error::Parse(format!("Failed to parse watch event: {}", e)))?;
            trace!("Watch event {}", event.event_type);

            self.events += 1;
            (self.handler)(event)?;
        }
        Ok(())
    }
}
