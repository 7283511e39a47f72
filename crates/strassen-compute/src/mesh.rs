//! In-process channel mesh: one bounded crossbeam channel per ordered rank
//! pair.
//!
//! Only links with a non-zero capacity are created. Each link has exactly one
//! sending endpoint and one receiving endpoint, so dropping an [`Endpoint`]
//! (for instance because its owner returned an error) disconnects every peer
//! waiting on it rather than leaving them blocked forever.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::channel::{Channel, ChannelError, MessageKey};

/// A keyed payload in flight.
#[derive(Debug)]
struct Envelope<K, P> {
    key: K,
    payload: P,
}

/// Shared message counters for one mesh.
#[derive(Debug, Default)]
struct Counters {
    sent: AtomicUsize,
    received: AtomicUsize,
}

/// Read-only view of the message counters of a mesh.
#[derive(Debug, Clone)]
pub struct MeshStats {
    counters: Arc<Counters>,
}

impl MeshStats {
    /// Messages handed to a link so far.
    pub fn sent(&self) -> usize {
        self.counters.sent.load(Ordering::SeqCst)
    }

    /// Messages taken off a link so far.
    pub fn received(&self) -> usize {
        self.counters.received.load(Ordering::SeqCst)
    }
}

/// A fully-connected-on-demand set of endpoints, indexed by rank.
pub struct Mesh<K, P> {
    endpoints: Vec<Endpoint<K, P>>,
    counters: Arc<Counters>,
}

impl<K: MessageKey, P: Send> Mesh<K, P> {
    /// Build a mesh of `ranks` endpoints. `capacity(source, dest)` gives the
    /// buffer size of the link from `source` to `dest`; zero means no link.
    pub fn new(ranks: usize, capacity: impl Fn(usize, usize) -> usize) -> Self {
        let counters = Arc::new(Counters::default());

        let mut outbound: Vec<Vec<Option<Sender<Envelope<K, P>>>>> =
            (0..ranks).map(|_| (0..ranks).map(|_| None).collect()).collect();
        let mut inbound: Vec<Vec<Option<Receiver<Envelope<K, P>>>>> =
            (0..ranks).map(|_| (0..ranks).map(|_| None).collect()).collect();

        let mut links = 0;
        for source in 0..ranks {
            for dest in 0..ranks {
                let cap = capacity(source, dest);
                if source == dest || cap == 0 {
                    continue;
                }
                let (tx, rx) = crossbeam_channel::bounded(cap);
                outbound[source][dest] = Some(tx);
                inbound[dest][source] = Some(rx);
                links += 1;
            }
        }
        log::debug!("mesh: {} ranks, {} links", ranks, links);

        let endpoints = outbound
            .into_iter()
            .zip(inbound)
            .enumerate()
            .map(|(rank, (outbound, inbound))| Endpoint {
                rank,
                outbound,
                inbound,
                counters: Arc::clone(&counters),
            })
            .collect();

        Self { endpoints, counters }
    }

    /// Counter handle that stays valid after the endpoints are handed out.
    pub fn stats(&self) -> MeshStats {
        MeshStats {
            counters: Arc::clone(&self.counters),
        }
    }

    /// Take ownership of the endpoints, ordered by rank.
    pub fn into_endpoints(self) -> Vec<Endpoint<K, P>> {
        self.endpoints
    }
}

/// One rank's endpoint on a [`Mesh`].
pub struct Endpoint<K, P> {
    rank: usize,
    outbound: Vec<Option<Sender<Envelope<K, P>>>>,
    inbound: Vec<Option<Receiver<Envelope<K, P>>>>,
    counters: Arc<Counters>,
}

impl<K: MessageKey, P: Send> Channel<K, P> for Endpoint<K, P> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn send(&self, dest: usize, key: K, payload: P) -> Result<(), ChannelError> {
        let link = self
            .outbound
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or(ChannelError::NoLink {
                source_rank: self.rank,
                dest_rank: dest,
            })?;

        link.send(Envelope { key, payload })
            .map_err(|_| ChannelError::Disconnected { peer: dest })?;
        self.counters.sent.fetch_add(1, Ordering::SeqCst);
        log::trace!("rank {} -> rank {}: {:?}", self.rank, dest, key);
        Ok(())
    }

    fn recv(&self, source: usize, key: K) -> Result<P, ChannelError> {
        let link = self
            .inbound
            .get(source)
            .and_then(Option::as_ref)
            .ok_or(ChannelError::NoLink {
                source_rank: source,
                dest_rank: self.rank,
            })?;

        let envelope = link
            .recv()
            .map_err(|_| ChannelError::Disconnected { peer: source })?;
        self.counters.received.fetch_add(1, Ordering::SeqCst);

        if envelope.key != key {
            return Err(ChannelError::UnexpectedKey {
                source_rank: source,
                expected: format!("{:?}", key),
                received: format!("{:?}", envelope.key),
            });
        }
        log::trace!("rank {} <- rank {}: {:?}", self.rank, source, key);
        Ok(envelope.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Key {
        Ping,
        Pong,
    }

    fn pair() -> Vec<Endpoint<Key, u32>> {
        Mesh::new(2, |_, _| 1).into_endpoints()
    }

    #[test]
    fn test_ping_pong_across_threads() {
        let mesh = Mesh::<Key, u32>::new(2, |_, _| 1);
        let stats = mesh.stats();
        let mut endpoints = mesh.into_endpoints();
        let right = endpoints.pop().unwrap();
        let left = endpoints.pop().unwrap();

        let handle = thread::spawn(move || {
            let value = right.recv(0, Key::Ping).unwrap();
            right.send(0, Key::Pong, value + 1).unwrap();
        });

        left.send(1, Key::Ping, 41).unwrap();
        assert_eq!(left.recv(1, Key::Pong).unwrap(), 42);
        handle.join().unwrap();

        assert_eq!(stats.sent(), 2);
        assert_eq!(stats.received(), 2);
    }

    #[test]
    fn test_missing_link_is_rejected() {
        let mesh = Mesh::<Key, u32>::new(2, |source, _| if source == 0 { 1 } else { 0 });
        let endpoints = mesh.into_endpoints();
        let err = endpoints[1].send(0, Key::Pong, 1).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::NoLink {
                source_rank: 1,
                dest_rank: 0
            }
        ));
    }

    #[test]
    fn test_dropped_peer_disconnects() {
        let mut endpoints = pair();
        let right = endpoints.pop().unwrap();
        let left = endpoints.pop().unwrap();
        drop(right);
        assert!(matches!(
            left.recv(1, Key::Pong),
            Err(ChannelError::Disconnected { peer: 1 })
        ));
        assert!(matches!(
            left.send(1, Key::Ping, 0),
            Err(ChannelError::Disconnected { peer: 1 })
        ));
    }

    #[test]
    fn test_key_mismatch_is_reported() {
        let endpoints = pair();
        endpoints[0].send(1, Key::Ping, 7).unwrap();
        let err = endpoints[1].recv(0, Key::Pong).unwrap_err();
        match err {
            ChannelError::UnexpectedKey {
                source_rank,
                expected,
                received,
            } => {
                assert_eq!(source_rank, 0);
                assert_eq!(expected, "Pong");
                assert_eq!(received, "Ping");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
