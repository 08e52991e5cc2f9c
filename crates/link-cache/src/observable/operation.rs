/// Membership change of an [`ObservableList`](super::ObservableList).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOperation<T> {
    Add(T),
    Remove(T),
}

impl<T> ListOperation<T> {
    pub fn item(&self) -> &T {
        match self {
            ListOperation::Add(item) | ListOperation::Remove(item) => item,
        }
    }
}

/// Membership change of an [`ObservableMap`](super::ObservableMap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapOperation<K, V> {
    Add { key: K, value: V },
    Remove { key: K, value: V },
}

impl<K, V> MapOperation<K, V> {
    pub fn key(&self) -> &K {
        match self {
            MapOperation::Add { key, .. } | MapOperation::Remove { key, .. } => key,
        }
    }
}
