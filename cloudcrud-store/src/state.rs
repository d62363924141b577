/// Snapshot of a store's published state.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<T> {
    /// Items in server order, from the last successful fetch.
    pub items: Vec<T>,
    /// True exactly while an operation is running.
    pub is_loading: bool,
    /// Human-readable description of the last failure.
    pub error_message: Option<String>,
}

impl<T> CollectionState<T> {
    pub fn is_idle(&self) -> bool {
        !self.is_loading
    }
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            error_message: None,
        }
    }
}
