//! Observable collection store for cloudcrud entities.
//!
//! An [`ObservableCollectionStore`] mirrors one entity type's remote records
//! for a presentation layer. It publishes a [`CollectionState`] snapshot
//! (items, loading flag, last error) through a `tokio::sync::watch` channel
//! and reloads the whole list after every successful write.
//!
//! Store operations never return errors. Failures show up only as
//! `error_message` on the published state.

mod state;
mod store;

pub use state::CollectionState;
pub use store::ObservableCollectionStore;
