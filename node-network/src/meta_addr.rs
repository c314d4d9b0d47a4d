//! An entry in an `addr` message: a peer's address, the services it
//! advertises, and when it was last seen active.

use std::io;
use std::net::SocketAddr;

use chrono::{DateTime, TimeZone, Utc};
use node_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

use crate::protocol::external::types::PeerServices;

/// One entry of an `addr` message, or a candidate the address book hands
/// back to the connection opener.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct MetaAddr {
    /// The peer's address.
    pub addr: SocketAddr,
    /// The services this peer last advertised in its `version` message.
    pub services: PeerServices,
    /// The last time this node observed the peer active, to the nearest
    /// second (the wire format only carries a 4-byte Unix timestamp).
    pub last_seen: DateTime<Utc>,
}

impl MetaAddr {
    /// Builds a `MetaAddr` for a peer observed active right now.
    pub fn new(addr: SocketAddr, services: PeerServices) -> MetaAddr {
        MetaAddr {
            addr,
            services,
            last_seen: Utc::now(),
        }
    }
}

impl BitcoinSerialize for MetaAddr {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        (self.last_seen.timestamp() as u32).bitcoin_serialize(&mut writer)?;
        self.services.bitcoin_serialize(&mut writer)?;
        self.addr.bitcoin_serialize(&mut writer)
    }
}

impl BitcoinDeserialize for MetaAddr {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let last_seen = Utc.timestamp(u32::bitcoin_deserialize(&mut reader)? as i64, 0);
        let services = PeerServices::bitcoin_deserialize(&mut reader)?;
        let addr = SocketAddr::bitcoin_deserialize(&mut reader)?;
        Ok(MetaAddr {
            addr,
            services,
            last_seen,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_its_wire_encoding() {
        node_test::init();
        let addr = MetaAddr {
            addr: "203.0.113.6:8333".parse().unwrap(),
            services: PeerServices::NODE_NETWORK,
            last_seen: Utc.timestamp(1_600_000_000, 0),
        };
        let bytes = addr.bitcoin_serialize_to_vec().unwrap();
        let parsed = MetaAddr::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(addr, parsed);
    }
}
