//! Stream ledger storage.
//!
//! One record per ordered (receiver, sender) pair, plus the module params.
//! Iteration follows key order (receiver-major, then sender), which makes
//! exports and invariant sums reproducible across replicas.

use crate::coin::Address;
use crate::params::Params;
use crate::stream::{Stream, StreamKey};
use std::collections::BTreeMap;

/// Boxed iterator over stored streams in key order.
pub type StreamIter<'a> = Box<dyn Iterator<Item = (StreamKey, Stream)> + 'a>;

/// Ordered key-value storage for streams and params.
///
/// `iter_all` and `iter_by_receiver` are expected to be prefix scans on the
/// underlying store. `iter_by_sender` is a filtered full scan and should stay
/// off the hot path.
pub trait StreamStore {
    fn get(&self, receiver: &Address, sender: &Address) -> Option<Stream>;

    fn set(&mut self, receiver: &Address, sender: &Address, stream: Stream);

    fn exists(&self, receiver: &Address, sender: &Address) -> bool {
        self.get(receiver, sender).is_some()
    }

    fn delete(&mut self, receiver: &Address, sender: &Address);

    fn iter_all(&self) -> StreamIter<'_>;

    fn iter_by_receiver<'a>(&'a self, receiver: &Address) -> StreamIter<'a>;

    fn iter_by_sender<'a>(&'a self, sender: &Address) -> StreamIter<'a> {
        let sender = sender.clone();
        Box::new(self.iter_all().filter(move |(key, _)| key.sender == sender))
    }

    /// Stored params, if any were ever written.
    fn params(&self) -> Option<Params>;

    fn set_params(&mut self, params: Params);

    /// Removes every stream. Params are kept.
    fn clear_streams(&mut self);
}

/// In-memory `StreamStore` backed by a `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    streams: BTreeMap<StreamKey, Stream>,
    params: Option<Params>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl StreamStore for MemoryStore {
    fn get(&self, receiver: &Address, sender: &Address) -> Option<Stream> {
        self.streams.get(&StreamKey::new(receiver, sender)).cloned()
    }

    fn set(&mut self, receiver: &Address, sender: &Address, stream: Stream) {
        self.streams.insert(StreamKey::new(receiver, sender), stream);
    }

    fn exists(&self, receiver: &Address, sender: &Address) -> bool {
        self.streams.contains_key(&StreamKey::new(receiver, sender))
    }

    fn delete(&mut self, receiver: &Address, sender: &Address) {
        self.streams.remove(&StreamKey::new(receiver, sender));
    }

    fn iter_all(&self) -> StreamIter<'_> {
        Box::new(self.streams.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    fn iter_by_receiver<'a>(&'a self, receiver: &Address) -> StreamIter<'a> {
        let start = StreamKey::new(receiver, &Address::new(""));
        let receiver = receiver.clone();
        Box::new(
            self.streams
                .range(start..)
                .take_while(move |(k, _)| k.receiver == receiver)
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }

    fn params(&self) -> Option<Params> {
        self.params.clone()
    }

    fn set_params(&mut self, params: Params) {
        self.params = Some(params);
    }

    fn clear_streams(&mut self) {
        self.streams.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    fn stream(flow_rate: i64) -> Stream {
        Stream::new("nund", flow_rate, true, 0)
    }

    fn populated() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.set(&addr("bob"), &addr("carol"), stream(1));
        store.set(&addr("alice"), &addr("dave"), stream(2));
        store.set(&addr("bob"), &addr("alice"), stream(3));
        store.set(&addr("carol"), &addr("alice"), stream(4));
        store
    }

    #[test]
    fn test_get_set_exists_delete() {
        let mut store = MemoryStore::new();
        assert!(!store.exists(&addr("r"), &addr("s")));
        assert!(store.get(&addr("r"), &addr("s")).is_none());

        store.set(&addr("r"), &addr("s"), stream(7));
        assert!(store.exists(&addr("r"), &addr("s")));
        assert_eq!(store.get(&addr("r"), &addr("s")).unwrap().flow_rate, 7);
        // ordered pair: the reverse direction is a different stream
        assert!(!store.exists(&addr("s"), &addr("r")));

        store.delete(&addr("r"), &addr("s"));
        assert!(!store.exists(&addr("r"), &addr("s")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_iter_all_is_receiver_major() {
        let store = populated();
        let keys: Vec<(String, String)> = store
            .iter_all()
            .map(|(k, _)| (k.receiver.to_string(), k.sender.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("alice".to_string(), "dave".to_string()),
                ("bob".to_string(), "alice".to_string()),
                ("bob".to_string(), "carol".to_string()),
                ("carol".to_string(), "alice".to_string()),
            ]
        );
    }

    #[test]
    fn test_iter_by_receiver() {
        let store = populated();
        let rates: Vec<i64> = store
            .iter_by_receiver(&addr("bob"))
            .map(|(_, s)| s.flow_rate)
            .collect();
        assert_eq!(rates, vec![3, 1]);
        assert_eq!(store.iter_by_receiver(&addr("zed")).count(), 0);
    }

    #[test]
    fn test_iter_by_sender() {
        let store = populated();
        let receivers: Vec<String> = store
            .iter_by_sender(&addr("alice"))
            .map(|(k, _)| k.receiver.to_string())
            .collect();
        assert_eq!(receivers, vec!["bob".to_string(), "carol".to_string()]);
    }

    #[test]
    fn test_clear_streams_keeps_params() {
        let mut store = populated();
        store.set_params(Params::default());
        store.clear_streams();
        assert!(store.is_empty());
        assert!(store.params().is_some());
    }
}
