//! One user's dashboard session.
//!
//! Updates flow along an explicit dependency chain: a successful load replaces
//! the dataset, the schema is recomputed from it, and selection defaults are
//! regenerated from the schema. Subscribers are notified in that order.
//!
//! Loads are serialized per session. Renders work on an immutable snapshot
//! taken under the state lock, so a concurrent load can never be observed
//! half-applied.
//!
//! Listeners run after every session lock has been released. They may call
//! back into the session (load, subscribe, render) but must not block on
//! another thread that is itself waiting on the session.

use crate::config::DashboardConfig;
use crate::data::Dataset;
use crate::dispatch::{self, DispatchOptions};
use crate::error::{LoadError, SelectionError};
use crate::ir::Chart;
use crate::loader::{DataSource, Loader};
use crate::schema::{self, Schema};
use crate::selection::Selection;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DatasetChanged { rows: usize, columns: usize },
    SchemaChanged { numeric_columns: Vec<String> },
    SelectionReset,
    /// User-visible, non-fatal message
    Notice(String),
}

pub type Listener = Box<dyn Fn(&SessionEvent) + Send + Sync>;

type SharedListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

struct SessionState {
    dataset: Arc<Dataset>,
    schema: Arc<Schema>,
    selection: Selection,
}

/// Immutable view of the session at one instant
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub dataset: Arc<Dataset>,
    pub schema: Arc<Schema>,
    pub selection: Selection,
}

impl Snapshot {
    pub fn render(&self, options: &DispatchOptions) -> Chart {
        dispatch::render(&self.dataset, &self.selection, options)
    }
}

pub struct Session {
    loader: Loader,
    options: DispatchOptions,
    state: RwLock<SessionState>,
    load_lock: Mutex<()>,
    listeners: RwLock<Vec<SharedListener>>,
}

impl Session {
    pub fn new(config: &DashboardConfig) -> Self {
        let loader = Loader::with_timeout(
            Duration::from_secs(config.fetch_timeout_secs),
            config.sample_seed,
        );
        Self::with_loader(loader, DispatchOptions::from(config))
    }

    pub fn with_loader(loader: Loader, options: DispatchOptions) -> Self {
        Self {
            loader,
            options,
            state: RwLock::new(SessionState {
                dataset: Arc::new(Dataset::empty()),
                schema: Arc::new(Schema::default()),
                selection: Selection::default(),
            }),
            load_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Listener) {
        self.listeners.write().push(Arc::from(listener));
    }

    /// Load a dataset. On failure the current dataset is kept and a notice is emitted.
    pub fn load(&self, source: DataSource) -> Result<(), LoadError> {
        let outcome = {
            let _serialized = self.load_lock.lock();
            self.loader
                .load(&source)
                .map(|dataset| self.replace_dataset(dataset, &source))
        };

        match outcome {
            Ok(events) => {
                for event in &events {
                    self.emit(event);
                }
                Ok(())
            }
            Err(err) => {
                warn!(%err, "load failed, keeping current dataset");
                self.emit(&SessionEvent::Notice(format!("Failed to load data: {}", err)));
                Err(err)
            }
        }
    }

    /// Swap in a new dataset and return the events describing the change
    fn replace_dataset(&self, dataset: Dataset, source: &DataSource) -> Vec<SessionEvent> {
        let mut state = self.state.write();
        state.dataset = Arc::new(dataset);
        state.selection.set_source(source);
        let mut events = vec![SessionEvent::DatasetChanged {
            rows: state.dataset.row_count(),
            columns: state.dataset.column_count(),
        }];
        events.extend(Self::on_dataset_changed(&mut state));
        events
    }

    fn on_dataset_changed(state: &mut SessionState) -> Vec<SessionEvent> {
        state.schema = Arc::new(schema::inspect(&state.dataset));
        debug!(
            columns = state.schema.column_count(),
            numeric = ?state.schema.numeric_columns,
            "schema recomputed"
        );
        let mut events = vec![SessionEvent::SchemaChanged {
            numeric_columns: state.schema.numeric_columns.clone(),
        }];
        events.extend(Self::on_schema_changed(state));
        events
    }

    fn on_schema_changed(state: &mut SessionState) -> Vec<SessionEvent> {
        let schema = Arc::clone(&state.schema);
        state.selection.reset_defaults(&schema);
        vec![SessionEvent::SelectionReset]
    }

    /// Apply one named selection edit; rejected edits leave the selection as it was
    pub fn update_selection(&self, field: &str, value: &str) -> Result<(), SelectionError> {
        let result = {
            let mut state = self.state.write();
            let schema = Arc::clone(&state.schema);
            let mut next = state.selection.clone();
            let result = next.apply(&schema, field, value);
            if result.is_ok() {
                state.selection = next;
            }
            result
        };

        if let Err(err) = &result {
            self.emit(&SessionEvent::Notice(format!("Invalid selection: {}", err)));
        }
        result
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            dataset: Arc::clone(&state.dataset),
            schema: Arc::clone(&state.schema),
            selection: state.selection.clone(),
        }
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.state.read().schema)
    }

    pub fn selection(&self) -> Selection {
        self.state.read().selection.clone()
    }

    /// Render the current selection on a snapshot
    pub fn render(&self) -> Chart {
        self.snapshot().render(&self.options)
    }

    /// Render off the calling thread; the snapshot is taken before returning
    pub fn spawn_render(&self) -> JoinHandle<Chart> {
        let snapshot = self.snapshot();
        let options = self.options;
        std::thread::spawn(move || snapshot.render(&options))
    }

    /// Announce a non-fatal problem to subscribers
    pub fn notice(&self, message: impl Into<String>) {
        self.emit(&SessionEvent::Notice(message.into()));
    }

    fn emit(&self, event: &SessionEvent) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener(event);
        }
    }
}
