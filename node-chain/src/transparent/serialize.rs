//! Manual wire (de)serialization for the transparent input/outpoint types.
//!
//! `OutPoint` and `Output` have enough uniform structure for
//! `#[derive(BtcSerialize)]`, but `Input` doesn't: a coinbase input and a
//! regular input share the same outpoint+script+sequence shape on the wire
//! (a coinbase is simply the input whose outpoint hash is all-zero and
//! index is `0xffffffff`), so the enum needs a hand-written encoding rather
//! than per-variant derive output.

use std::io;

use crate::{
    compactint::CompactInt,
    serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError},
    transaction,
};

use super::{CoinbaseData, Input, OutPoint, Script};

impl BitcoinDeserialize for OutPoint {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(OutPoint {
            hash: transaction::Hash::bitcoin_deserialize(&mut reader)?,
            index: u32::bitcoin_deserialize(&mut reader)?,
        })
    }
}

impl OutPoint {
    /// The sentinel outpoint referenced by every coinbase input: a
    /// null transaction hash with an all-ones index.
    pub fn null() -> OutPoint {
        OutPoint {
            hash: transaction::Hash([0; 32]),
            index: 0xffff_ffff,
        }
    }

    pub fn is_null(&self) -> bool {
        self.hash.0 == [0; 32] && self.index == 0xffff_ffff
    }
}

impl BitcoinSerialize for Input {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        match self {
            Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            } => {
                outpoint.bitcoin_serialize(&mut target)?;
                unlock_script.bitcoin_serialize(&mut target)?;
                sequence.bitcoin_serialize(&mut target)
            }
            Input::Coinbase {
                data, sequence, ..
            } => {
                OutPoint::null().bitcoin_serialize(&mut target)?;
                CompactInt::from(data.0.len()).bitcoin_serialize(&mut target)?;
                target.write_all(&data.0)?;
                sequence.bitcoin_serialize(&mut target)
            }
        }
    }
}

impl BitcoinDeserialize for Input {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let outpoint = OutPoint::bitcoin_deserialize(&mut reader)?;
        let len = CompactInt::bitcoin_deserialize(&mut reader)?.value() as usize;
        let mut script_bytes = vec![0u8; 0];
        {
            use std::io::Read as _;
            let mut limited = (&mut reader).take(len as u64);
            limited.read_to_end(&mut script_bytes)?;
        }
        let sequence = u32::bitcoin_deserialize(&mut reader)?;

        if outpoint.is_null() {
            Ok(Input::Coinbase {
                height: None,
                data: CoinbaseData(script_bytes),
                sequence,
            })
        } else {
            Ok(Input::PrevOut {
                outpoint,
                unlock_script: Script(script_bytes),
                sequence,
            })
        }
    }
}
