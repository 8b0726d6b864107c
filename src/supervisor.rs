//! The acquisition supervisor owns the line source's lifecycle on a
//! dedicated background task: it opens the source, reads and parses
//! records, publishes them to the store, and recovers from transport
//! failures with a fixed retry delay.
//!
//! Failures never leave this module. The store stays queryable while
//! the source is down, and the task only ends when told to. The owner
//! awaits full termination, so the device handle is never left open
//! after shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    projection::Rules,
    push::PushHook,
    record::Record,
    source::{Connection, LineSource},
    store::{Batch, Store},
};

/// Delay before a failed line source is opened again.
/// Deliberately fixed, not exponential.
pub const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Everything the acquisition task needs at spawn time.
#[derive(Debug)]
pub struct Supervisor {
    store: Arc<Store>,
    source: LineSource,
    projections: Option<PathBuf>,
    push: Option<PushHook>,
}

impl Supervisor {
    /// A supervisor feeding `store` from `source`.
    pub fn new(store: Arc<Store>, source: LineSource) -> Self {
        Self {
            store,
            source,
            projections: None,
            push: None,
        }
    }

    /// Re-read this projections file for every record and publish the
    /// derived readings it defines.
    pub fn with_projections(mut self, path: PathBuf) -> Self {
        self.projections = Some(path);
        self
    }

    /// Also hand every accepted reading to a receiver script.
    pub fn with_push(mut self, hook: PushHook) -> Self {
        self.push = Some(hook);
        self
    }

    /// Start the acquisition loop on its own task.
    pub fn spawn(self) -> SupervisorHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(self, shutdown.clone()));

        SupervisorHandle { shutdown, task }
    }

    /// Publish one message to both the process log and the store's
    /// log entry.
    fn publish_log(&self, message: &str) {
        info!("{message}");
        self.store.append_log(message);
    }

    /// The current rule set, or no rules when the file is missing or
    /// malformed. That situation is logged once, not per record.
    fn load_rules(&self, logged_bad_rules: &mut bool) -> Rules {
        let Some(path) = &self.projections else {
            return Rules::empty();
        };

        match Rules::load(path) {
            Ok(rules) => rules,
            Err(e) => {
                if !*logged_bad_rules {
                    self.publish_log(&format!("Projections disabled: {e}"));
                    *logged_bad_rules = true;
                }
                Rules::empty()
            }
        }
    }

    /// Publish one parsed record: evaluate the projection rules, hand
    /// the batch to the store, then fire the push hook.
    fn deliver(&self, record: Record, logged_bad_rules: &mut bool) {
        let rules = self.load_rules(logged_bad_rules);
        let composite = record.composite();

        let outcomes = rules.evaluate(record.fields());
        let mut batch = Batch::new(record);

        for outcome in outcomes {
            match outcome {
                Ok((name, value)) => batch.push_derived(name, value),
                Err(e) => {
                    warn!("{e}");
                    self.store.append_log(&e.to_string());
                }
            }
        }

        self.store.publish(batch);

        if let Some(push) = &self.push {
            push.deliver(&composite);
        }
    }
}

/// Controls a running acquisition task.
#[derive(Debug)]
pub struct SupervisorHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Signal the task to stop and wait until it has fully exited.
    ///
    /// When this returns, the line source is closed and no further
    /// reading will be published.
    pub async fn shutdown(self) {
        self.shutdown.cancel();

        if let Err(e) = self.task.await {
            error!(?e, "The acquisition task did not exit cleanly");
        }
    }
}

async fn run(supervisor: Supervisor, shutdown: CancellationToken) {
    supervisor.publish_log("Acquisition loop starting");

    // A closed source plus a future `open_when` is the whole backoff
    // state; there is no separate backoff mode.
    let mut connection: Option<Connection> = None;
    let mut open_when = Instant::now();
    let mut logged_bad_rules = false;

    loop {
        match connection.take() {
            None => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep_until(open_when) => {}
                }

                supervisor.publish_log("Opening the line source");

                match supervisor.source.open() {
                    Ok((open, greeting)) => {
                        for message in greeting {
                            supervisor.publish_log(&message);
                        }
                        connection = Some(open);
                    }
                    Err(e) => {
                        supervisor.publish_log(&format!("Error opening the line source: {e}"));
                        supervisor.publish_log(&format!(
                            "Will retry opening in {} seconds...",
                            RETRY_DELAY.as_secs()
                        ));
                        open_when = Instant::now() + RETRY_DELAY;
                    }
                }
            }
            Some(mut open) => {
                let read = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    read = open.next_line() => read,
                };

                match read {
                    Ok(line) => {
                        // Noise (empty or NUL-glitched lines) parses to
                        // nothing and is dropped without a trace.
                        if let Some(record) = Record::parse(&line, Utc::now()) {
                            supervisor.deliver(record, &mut logged_bad_rules);
                        }
                        connection = Some(open);
                    }
                    Err(e) => {
                        // `open` drops here, which is the close; a close
                        // cannot fail observably. Only the one in-flight
                        // read is lost.
                        supervisor.publish_log(&format!("Error reading from the line source: {e}"));
                        supervisor.publish_log(&format!(
                            "Will re-open the line source in {} seconds...",
                            RETRY_DELAY.as_secs()
                        ));
                        open_when = Instant::now() + RETRY_DELAY;
                    }
                }
            }
        }
    }

    // Breaking out of the loop drops a taken connection with its arm's
    // scope, so the device handle is closed before the task reports
    // completion.
    supervisor.publish_log("Acquisition loop stopping");
}
