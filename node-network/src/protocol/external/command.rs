//! The 12-byte ASCII command string that names a message's type on the wire.

use std::io;

use node_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A message's command, as it appears in the wire header: a null-padded
/// 12-byte ASCII string, represented here as an enum for type safety.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Command {
    Version,
    Verack,
    Ping,
    Pong,
    Reject,
    GetAddr,
    Addr,
    GetBlocks,
    Inv,
    GetHeaders,
    Headers,
    GetData,
    Block,
    Tx,
    NotFound,
    MemPool,
    FilterLoad,
    FilterAdd,
    FilterClear,
    MerkleBlock,
    CmpctBlock,
    GetBlockTxn,
    BlockTxn,
    SendCmpct,
    FeeFilter,
    SendHeaders,
    Alert,
}

impl Command {
    /// This command's null-padded 12-byte ASCII wire encoding.
    pub fn bytes(self) -> &'static [u8; 12] {
        match self {
            Command::Version => b"version\0\0\0\0\0",
            Command::Verack => b"verack\0\0\0\0\0\0",
            Command::Ping => b"ping\0\0\0\0\0\0\0\0",
            Command::Pong => b"pong\0\0\0\0\0\0\0\0",
            Command::Reject => b"reject\0\0\0\0\0\0",
            Command::GetAddr => b"getaddr\0\0\0\0\0",
            Command::Addr => b"addr\0\0\0\0\0\0\0\0",
            Command::GetBlocks => b"getblocks\0\0\0",
            Command::Inv => b"inv\0\0\0\0\0\0\0\0\0",
            Command::GetHeaders => b"getheaders\0\0",
            Command::Headers => b"headers\0\0\0\0\0",
            Command::GetData => b"getdata\0\0\0\0\0",
            Command::Block => b"block\0\0\0\0\0\0\0",
            Command::Tx => b"tx\0\0\0\0\0\0\0\0\0\0",
            Command::NotFound => b"notfound\0\0\0\0",
            Command::MemPool => b"mempool\0\0\0\0\0",
            Command::FilterLoad => b"filterload\0\0",
            Command::FilterAdd => b"filteradd\0\0\0",
            Command::FilterClear => b"filterclear\0",
            Command::MerkleBlock => b"merkleblock\0",
            Command::CmpctBlock => b"cmpctblock\0\0",
            Command::GetBlockTxn => b"getblocktxn\0",
            Command::BlockTxn => b"blocktxn\0\0\0\0",
            Command::SendCmpct => b"sendcmpct\0\0\0",
            Command::FeeFilter => b"feefilter\0\0\0",
            Command::SendHeaders => b"sendheaders\0",
            Command::Alert => b"alert\0\0\0\0\0\0\0",
        }
    }
}

impl BitcoinSerialize for Command {
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.bytes().bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for Command {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let bytes = <[u8; 12]>::bitcoin_deserialize(reader)?;
        let command = match &bytes {
            b"version\0\0\0\0\0" => Command::Version,
            b"verack\0\0\0\0\0\0" => Command::Verack,
            b"ping\0\0\0\0\0\0\0\0" => Command::Ping,
            b"pong\0\0\0\0\0\0\0\0" => Command::Pong,
            b"reject\0\0\0\0\0\0" => Command::Reject,
            b"getaddr\0\0\0\0\0" => Command::GetAddr,
            b"addr\0\0\0\0\0\0\0\0" => Command::Addr,
            b"getblocks\0\0\0" => Command::GetBlocks,
            b"inv\0\0\0\0\0\0\0\0\0" => Command::Inv,
            b"getheaders\0\0" => Command::GetHeaders,
            b"headers\0\0\0\0\0" => Command::Headers,
            b"getdata\0\0\0\0\0" => Command::GetData,
            b"block\0\0\0\0\0\0\0" => Command::Block,
            b"tx\0\0\0\0\0\0\0\0\0\0" => Command::Tx,
            b"notfound\0\0\0\0" => Command::NotFound,
            b"mempool\0\0\0\0\0" => Command::MemPool,
            b"filterload\0\0" => Command::FilterLoad,
            b"filteradd\0\0\0" => Command::FilterAdd,
            b"filterclear\0" => Command::FilterClear,
            b"merkleblock\0" => Command::MerkleBlock,
            b"cmpctblock\0\0" => Command::CmpctBlock,
            b"getblocktxn\0" => Command::GetBlockTxn,
            b"blocktxn\0\0\0\0" => Command::BlockTxn,
            b"sendcmpct\0\0\0" => Command::SendCmpct,
            b"feefilter\0\0\0" => Command::FeeFilter,
            b"sendheaders\0" => Command::SendHeaders,
            b"alert\0\0\0\0\0\0\0" => Command::Alert,
            _ => return Err(SerializationError::Parse("unrecognized message command")),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_round_trips_through_its_wire_bytes() {
        node_test::init();
        let commands = [
            Command::Version,
            Command::Verack,
            Command::Ping,
            Command::Pong,
            Command::Reject,
            Command::GetAddr,
            Command::Addr,
            Command::GetBlocks,
            Command::Inv,
            Command::GetHeaders,
            Command::Headers,
            Command::GetData,
            Command::Block,
            Command::Tx,
            Command::NotFound,
            Command::MemPool,
            Command::FilterLoad,
            Command::FilterAdd,
            Command::FilterClear,
            Command::MerkleBlock,
            Command::CmpctBlock,
            Command::GetBlockTxn,
            Command::BlockTxn,
            Command::SendCmpct,
            Command::FeeFilter,
            Command::SendHeaders,
            Command::Alert,
        ];
        for command in commands {
            assert_eq!(command.bytes().len(), 12);
            let parsed = Command::bitcoin_deserialize(&command.bytes()[..]).unwrap();
            assert_eq!(parsed, command);
        }
    }
}
