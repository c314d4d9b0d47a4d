//! Newtype wrappers for primitive wire types shared across messages.

use std::io;

use bitflags::bitflags;
use node_chain::parameters::Network;
use node_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The four-byte magic that prefixes every message on the wire, identifying
/// which network it belongs to.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Magic(pub [u8; 4]);

impl std::fmt::Debug for Magic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("Magic").field(&hex::encode(&self.0)).finish()
    }
}

impl From<Network> for Magic {
    fn from(network: Network) -> Self {
        Magic(network.magic())
    }
}

impl BitcoinSerialize for Magic {
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for Magic {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Magic(<[u8; 4]>::bitcoin_deserialize(reader)?))
    }
}

/// The wire-protocol version a peer speaks.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug, Hash)]
pub struct ProtocolVersion(pub u32);

impl BitcoinSerialize for ProtocolVersion {
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for ProtocolVersion {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(ProtocolVersion(u32::bitcoin_deserialize(reader)?))
    }
}

bitflags! {
    /// Services advertised by a peer in its `version` message, and tracked
    /// per-peer for routing `getdata` requests to peers that can serve them.
    #[derive(Default)]
    pub struct PeerServices: u64 {
        /// The peer can serve the full block chain and validate blocks from
        /// genesis.
        const NODE_NETWORK = 0x1;
        /// The peer supports BIP 37 bloom filters (`filterload`/`filteradd`).
        const NODE_BLOOM = 0x4;
        /// The peer supports compact block relay (BIP 152).
        const NODE_COMPACT_FILTERS = 0x40;
    }
}

impl BitcoinSerialize for PeerServices {
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.bits().bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for PeerServices {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        // Unknown bits are allowed: a peer can legitimately advertise a
        // service this node doesn't understand yet.
        Ok(PeerServices::from_bits_truncate(u64::bitcoin_deserialize(
            reader,
        )?))
    }
}

/// A nonce attached to `version` and `ping`/`pong` messages.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Nonce(pub u64);

impl BitcoinSerialize for Nonce {
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for Nonce {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Nonce(u64::bitcoin_deserialize(reader)?))
    }
}

/// The raw bit field of a BIP 37 bloom filter.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Filter(pub Vec<u8>);

/// The tweak value mixed into a BIP 37 bloom filter's hash functions.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Tweak(pub u32);
