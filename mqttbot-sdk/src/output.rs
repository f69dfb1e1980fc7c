//! Output backends for delivering facts.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mqttbot_types::Fact;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

#[cfg(feature = "mqtt")]
use crate::mqtt::MqttOutput;
use crate::retained::RetainedState;
use crate::PublishError;

/// Output destination for facts.
///
/// Configure where the reporter should deliver what the monitors publish.
#[derive(Debug)]
pub enum Output {
    /// Keep the retained values as a JSON object in a file.
    ///
    /// The file is rewritten with the full topic-to-payload map on every
    /// retained publish.
    File(StateFile),

    /// Send facts through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<Fact>),

    /// Record facts in memory.
    Memory(Arc<RetainedState>),

    /// Write every fact to the log at info level.
    Log,

    /// Publish to an MQTT broker.
    #[cfg(feature = "mqtt")]
    Mqtt(Arc<MqttOutput>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mqttbot_sdk::Output;
    ///
    /// let output = Output::file("retained.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(StateFile::new(path))
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// Publishing waits for buffer space, so a slow receiver slows the
    /// monitors down instead of losing facts.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mqttbot_sdk::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive facts
    /// // while let Some(fact) = rx.recv().await {
    /// //     println!("{} = {}", fact.topic, fact.payload);
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Fact>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Create a memory output and return the shared store it records into.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mqttbot_sdk::Output;
    ///
    /// let (output, state) = Output::memory();
    /// assert!(state.history().is_empty());
    /// ```
    pub fn memory() -> (Self, Arc<RetainedState>) {
        let state = Arc::new(RetainedState::new());
        (Output::Memory(state.clone()), state)
    }

    /// Wrap a connected broker client.
    #[cfg(feature = "mqtt")]
    pub fn mqtt(output: MqttOutput) -> Self {
        Output::Mqtt(Arc::new(output))
    }

    /// Deliver a fact to this output.
    pub(crate) async fn emit(&self, fact: &Fact) -> Result<(), PublishError> {
        match self {
            Output::File(file) => file.write(fact).await?,
            Output::Channel(tx) => {
                tx.send(fact.clone())
                    .await
                    .map_err(|_| PublishError::ChannelClosed)?;
            }
            Output::Memory(state) => state.record(fact),
            Output::Log => {
                info!(topic = %fact.topic, payload = %fact.payload, retain = fact.retain, "publish");
            }
            #[cfg(feature = "mqtt")]
            Output::Mqtt(client) => client.publish(fact).await?,
        }
        Ok(())
    }

    /// Release the output's connection, if it holds one.
    pub(crate) async fn close(&self) -> Result<(), PublishError> {
        match self {
            #[cfg(feature = "mqtt")]
            Output::Mqtt(client) => client.disconnect().await,
            _ => Ok(()),
        }
    }
}

/// Last retained value per topic, mirrored to a JSON file.
///
/// Only the last value of each topic is kept. Writers are serialized and
/// the file is swapped in by rename, so readers see either the previous or
/// the new map in full.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl StateFile {
    /// Create a state file at `path`. Nothing is written until the first
    /// retained fact.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: Mutex::new(BTreeMap::new()),
        }
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of topics held.
    pub async fn topic_count(&self) -> usize {
        self.values.lock().await.len()
    }

    async fn write(&self, fact: &Fact) -> Result<(), PublishError> {
        if !fact.retain {
            return Ok(());
        }

        let mut values = self.values.lock().await;
        values.insert(fact.topic.clone(), fact.payload.clone());
        let json = serde_json::to_string_pretty(&*values)?;

        let staging = staging_path(&self.path);
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

// Sibling of the target, so the rename stays on one filesystem.
fn staging_path(path: &Path) -> PathBuf {
    let mut staging = OsString::from(path.as_os_str());
    staging.push(".tmp");
    PathBuf::from(staging)
}
