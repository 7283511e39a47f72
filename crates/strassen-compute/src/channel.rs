//! Point-to-point, tagged, blocking transport between ranks.
//!
//! A [`Channel`] is one participant's view of the transport: it can send a
//! keyed payload to a peer rank and block until the next keyed payload from
//! a given peer arrives. Keys are compared on receipt, so a receive that
//! does not match what the peer actually sent is reported instead of being
//! silently consumed.

use std::fmt::Debug;

use thiserror::Error;

/// Errors raised by a channel transport. All of them are fatal for the
/// current invocation.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("No link from rank {source_rank} to rank {dest_rank}")]
    NoLink { source_rank: usize, dest_rank: usize },

    #[error("Peer rank {peer} disconnected")]
    Disconnected { peer: usize },

    #[error("Expected {expected} from rank {source_rank}, received {received}")]
    UnexpectedKey {
        source_rank: usize,
        expected: String,
        received: String,
    },
}

/// A message key. Keys only need to be comparable and printable.
pub trait MessageKey: Copy + Eq + Debug + Send + 'static {}

impl<K> MessageKey for K where K: Copy + Eq + Debug + Send + 'static {}

/// One participant's endpoint on a point-to-point transport.
pub trait Channel<K: MessageKey, P: Send> {
    /// Rank of the participant owning this endpoint.
    fn rank(&self) -> usize;

    /// Hand `payload` to the link towards `dest`. Returns once the payload
    /// has been buffered; does not wait for the receiver.
    fn send(&self, dest: usize, key: K, payload: P) -> Result<(), ChannelError>;

    /// Block until the next message from `source` arrives and check that it
    /// carries `key`.
    fn recv(&self, source: usize, key: K) -> Result<P, ChannelError>;
}
