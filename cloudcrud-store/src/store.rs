//! The per-entity collection store.

use crate::state::CollectionState;
use cloudcrud_client::{ClientError, RemoteCrudClient};
use cloudcrud_model::RecordCodec;
use cloudcrud_types::{Predicate, QuerySpec};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error};

/// Marks the store Busy for as long as it lives.
///
/// Dropping the guard returns the store to Idle, including when the
/// operation's future is dropped before completing.
struct LoadingGuard<'a, T> {
    state: &'a watch::Sender<CollectionState<T>>,
}

impl<'a, T> LoadingGuard<'a, T> {
    fn begin(state: &'a watch::Sender<CollectionState<T>>) -> Self {
        state.send_modify(|s| s.is_loading = true);
        Self { state }
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.is_loading = false);
    }
}

/// Observable mirror of one entity type's remote records.
///
/// Operations on one store run one at a time: a call made while another is
/// in flight waits for it to finish, in call order.
pub struct ObservableCollectionStore<T: RecordCodec + Clone> {
    client: RemoteCrudClient,
    base_query: QuerySpec,
    state: watch::Sender<CollectionState<T>>,
    /// Serializes operations.
    operation: Mutex<()>,
}

impl<T: RecordCodec + Clone> ObservableCollectionStore<T> {
    /// Creates an empty, idle store. Nothing is fetched until asked.
    pub fn new(client: RemoteCrudClient) -> Self {
        Self::with_base_query(client, QuerySpec::new())
    }

    /// Creates a store whose fetches use `base_query`'s sort order and
    /// page size. Its predicate applies when `fetch_all` gets none and
    /// to the reload after every write.
    pub fn with_base_query(client: RemoteCrudClient, base_query: QuerySpec) -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        Self {
            client,
            base_query,
            state,
            operation: Mutex::new(()),
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> CollectionState<T> {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<CollectionState<T>> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.borrow().error_message.clone()
    }

    /// Replaces the item list with every record matching `predicate`.
    ///
    /// On failure the previous items stay and `error_message` is set.
    pub async fn fetch_all(&self, predicate: Option<Predicate>) {
        let _operation = self.operation.lock().await;
        let _loading = LoadingGuard::begin(&self.state);
        self.reload(predicate).await;
    }

    /// Saves a new entity, then reloads the list.
    pub async fn add(&self, item: &T) {
        self.save(item, "Error adding item").await;
    }

    /// Saves changes to an entity, then reloads the list.
    pub async fn update(&self, item: &T) {
        self.save(item, "Error updating item").await;
    }

    /// Deletes an entity, then reloads the list.
    pub async fn delete(&self, item: &T) {
        let _operation = self.operation.lock().await;
        let _loading = LoadingGuard::begin(&self.state);

        match self.client.delete(item).await {
            Ok(()) => self.reload(None).await,
            Err(e) => self.fail("Error deleting item", &e),
        }
    }

    async fn save(&self, item: &T, context: &str) {
        let _operation = self.operation.lock().await;
        let _loading = LoadingGuard::begin(&self.state);

        match self.client.save_or_update(item).await {
            Ok(_) => self.reload(None).await,
            Err(e) => self.fail(context, &e),
        }
    }

    /// Fetch body shared by `fetch_all` and the post-write reload.
    /// Callers hold the operation lock and the loading guard.
    async fn reload(&self, predicate: Option<Predicate>) {
        let mut spec = self.base_query.clone();
        if let Some(predicate) = predicate {
            spec.predicate = predicate;
        }

        match self.client.fetch_all::<T>(&spec).await {
            Ok(items) => {
                debug!("Store loaded {} {} items", items.len(), T::RECORD_TYPE);
                self.state.send_modify(|s| {
                    s.items = items;
                    s.error_message = None;
                });
            }
            Err(e) => self.fail("Error fetching items", &e),
        }
    }

    fn fail(&self, context: &str, err: &ClientError) {
        error!("{} store: {context}: {err}", T::RECORD_TYPE);
        let message = format!("{context}: {err}");
        self.state.send_modify(|s| s.error_message = Some(message));
    }
}
