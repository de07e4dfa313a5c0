//! Reactive state container with asynchronous rehydration and fire-and-forget
//! persistence.
//!
//! A [`Store`] owns one state value inside a `tokio::sync::watch` channel.
//! Every mutation is a closure applied under the channel's write lock (read
//! current state, compute next state, install it), so concurrent operations on
//! disjoint keys never observe a half-applied update. Subscribers are woken only
//! when a mutation reports a change.
//!
//! On [`Store::open`] a background task loads the persisted projection, opens
//! the [`HydrationGate`], and then serves save requests in order. Saves carry no
//! data: the task serializes whatever the state is at write time, so a burst of
//! mutations produces a single write.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::hydration::HydrationGate;
use crate::persistence::KeyValueStore;
use crate::StorageError;

/// State that can be split into a durable projection and volatile fields.
pub trait PersistedState: Clone + Send + Sync + 'static {
    type Projection: Serialize + DeserializeOwned;

    /// Durable part of the state. Volatile fields are left out.
    fn project(&self) -> Self::Projection;

    /// Replaces the durable part of the state with a loaded projection.
    fn restore(&mut self, projection: Self::Projection);
}

enum PersistCommand {
    Save,
    Flush(oneshot::Sender<Result<(), StorageError>>),
}

struct StoreInner<S> {
    name: &'static str,
    state: Arc<watch::Sender<S>>,
    gate: HydrationGate,
    commands: mpsc::UnboundedSender<PersistCommand>,
}

/// Shared handle to one persisted store. Cloning is cheap.
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PersistedState> Store<S> {
    /// Creates the store with `initial` state and starts rehydrating it from
    /// `backend`. Must be called from within a tokio runtime.
    pub fn open(name: &'static str, initial: S, backend: Arc<dyn KeyValueStore>) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        let state = Arc::new(sender);
        let gate = HydrationGate::new();
        let (commands, receiver) = mpsc::unbounded_channel();

        tokio::spawn(run_persistence(
            name,
            Arc::clone(&state),
            gate.clone(),
            backend,
            receiver,
        ));

        Self {
            inner: Arc::new(StoreInner {
                name,
                state,
                gate,
                commands,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> S {
        self.inner.state.borrow().clone()
    }

    /// Reads the current state without cloning it.
    ///
    /// `f` runs under the channel's read lock and must not mutate this store.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let current = self.inner.state.borrow();
        f(&current)
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.inner.state.subscribe()
    }

    /// Applies a durable mutation. `f` returns whether it changed anything;
    /// changes notify subscribers and schedule a persistence write.
    pub fn mutate(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        let changed = self.inner.state.send_if_modified(f);
        if changed && self.inner.commands.send(PersistCommand::Save).is_err() {
            warn!(
                "persistence task for '{}' has stopped; change kept in memory only",
                self.inner.name
            );
        }
        changed
    }

    /// Applies a mutation that touches volatile fields only; nothing is persisted.
    pub fn mutate_volatile(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        self.inner.state.send_if_modified(f)
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.gate.is_hydrated()
    }

    /// Suspends until the persisted state has been loaded (or the attempt failed).
    pub async fn wait_ready(&self) {
        self.inner.gate.wait_ready().await;
    }

    /// Waits until every write scheduled so far has reached the backend and
    /// returns the outcome of the latest write.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let (ack, done) = oneshot::channel();
        self.inner
            .commands
            .send(PersistCommand::Flush(ack))
            .map_err(|_| StorageError::Unavailable(String::from("persistence task has stopped")))?;

        done.await.unwrap_or_else(|_| {
            Err(StorageError::Unavailable(String::from(
                "persistence task has stopped",
            )))
        })
    }
}

async fn run_persistence<S: PersistedState>(
    name: &'static str,
    state: Arc<watch::Sender<S>>,
    gate: HydrationGate,
    backend: Arc<dyn KeyValueStore>,
    mut commands: mpsc::UnboundedReceiver<PersistCommand>,
) {
    hydrate(name, &state, backend.as_ref()).await;
    if gate.open() {
        info!("store '{name}' hydrated");
    }

    let mut last_write = Ok(());
    while let Some(first) = commands.recv().await {
        let mut dirty = false;
        let mut acks = Vec::new();
        let mut next = Some(first);

        while let Some(command) = next {
            match command {
                PersistCommand::Save => dirty = true,
                PersistCommand::Flush(ack) => acks.push(ack),
            }
            next = commands.try_recv().ok();
        }

        if dirty {
            last_write = write(name, &state, backend.as_ref()).await;
        }
        for ack in acks {
            let _ = ack.send(last_write.clone());
        }
    }

    debug!("persistence task for '{name}' finished");
}

async fn hydrate<S: PersistedState>(
    name: &'static str,
    state: &watch::Sender<S>,
    backend: &dyn KeyValueStore,
) {
    match backend.load(name).await {
        Ok(Some(blob)) => match serde_json::from_str::<S::Projection>(&blob) {
            Ok(projection) => {
                state.send_modify(|current| current.restore(projection));
                debug!("restored persisted state for '{name}'");
            }
            Err(error) => warn!("discarding corrupt persisted state for '{name}': {error}"),
        },
        Ok(None) => debug!("no persisted state for '{name}'"),
        Err(error) => warn!("could not load persisted state for '{name}': {error}"),
    }
}

async fn write<S: PersistedState>(
    name: &'static str,
    state: &watch::Sender<S>,
    backend: &dyn KeyValueStore,
) -> Result<(), StorageError> {
    let blob = {
        let current = state.borrow();
        serde_json::to_string(&current.project()).map_err(|error| StorageError::Serialization {
            name: name.to_owned(),
            message: error.to_string(),
        })
    };

    let result = match blob {
        Ok(blob) => backend.save(name, blob).await,
        Err(error) => Err(error),
    };

    match &result {
        Ok(()) => debug!("persisted '{name}'"),
        Err(error) => warn!("failed to persist '{name}': {error}"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryKeyValueStore;
    use serde::Deserialize;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: u32,
        busy: bool,
    }

    #[derive(Serialize, Deserialize)]
    struct CounterBlob {
        value: u32,
    }

    impl PersistedState for Counter {
        type Projection = CounterBlob;

        fn project(&self) -> CounterBlob {
            CounterBlob { value: self.value }
        }

        fn restore(&mut self, projection: CounterBlob) {
            self.value = projection.value;
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn load<'a>(
            &'a self,
            _name: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + 'a>>
        {
            Box::pin(async { Err(StorageError::Unavailable(String::from("disk gone"))) })
        }

        fn save<'a>(
            &'a self,
            _name: &'a str,
            _blob: String,
        ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
            Box::pin(async { Err(StorageError::Unavailable(String::from("disk gone"))) })
        }
    }

    #[tokio::test]
    async fn restores_projection_and_keeps_volatile_defaults() {
        let backend = Arc::new(MemoryKeyValueStore::new().with_blob("counter", r#"{"value":7}"#));
        let store = Store::open("counter", Counter::default(), backend);

        store.wait_ready().await;
        assert!(store.is_hydrated());
        assert_eq!(store.snapshot(), Counter { value: 7, busy: false });
    }

    #[tokio::test]
    async fn corrupt_blob_still_opens_gate_with_defaults() {
        let backend = Arc::new(MemoryKeyValueStore::new().with_blob("counter", "{not json"));
        let store = Store::open("counter", Counter::default(), backend);

        store.wait_ready().await;
        assert_eq!(store.snapshot(), Counter::default());
    }

    #[tokio::test]
    async fn unavailable_storage_still_opens_gate() {
        let store = Store::open("counter", Counter::default(), Arc::new(BrokenStore));
        tokio::time::timeout(Duration::from_secs(1), store.wait_ready())
            .await
            .expect("gate opens");

        store.mutate(|state| {
            state.value = 1;
            true
        });
        assert_eq!(store.snapshot().value, 1);
        assert!(matches!(
            store.flush().await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn durable_mutations_are_written_volatile_ones_are_not() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = Store::open("counter", Counter::default(), backend.clone());
        store.wait_ready().await;

        store.mutate_volatile(|state| {
            state.busy = true;
            true
        });
        store.flush().await.expect("flush");
        assert_eq!(backend.get("counter"), None);

        for _ in 0..3 {
            store.mutate(|state| {
                state.value += 1;
                true
            });
        }
        store.flush().await.expect("flush");
        assert_eq!(backend.get("counter").as_deref(), Some(r#"{"value":3}"#));
    }

    #[tokio::test]
    async fn unchanged_mutation_does_not_notify() {
        let store = Store::open(
            "counter",
            Counter::default(),
            Arc::new(MemoryKeyValueStore::new()),
        );
        store.wait_ready().await;
        let mut receiver = store.subscribe();
        receiver.borrow_and_update();

        assert!(!store.mutate(|_| false));
        assert!(!receiver.has_changed().expect("sender alive"));

        assert!(store.mutate(|state| {
            state.value = 5;
            true
        }));
        assert!(receiver.has_changed().expect("sender alive"));
        assert_eq!(receiver.borrow_and_update().value, 5);
    }
}
