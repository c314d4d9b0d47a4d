//! Append-only `blkNNNN.dat` storage: every finalized block, framed with a
//! 4-byte network magic and a 4-byte little-endian length, concatenated into
//! numbered files capped below 2 GiB (spec.md §4.3.3).

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::PathBuf,
};

use node_chain::{block::Block, parameters::Network, BitcoinSerialize};

use crate::BoxError;

/// The maximum size a single `blkNNNN.dat` file is allowed to grow to
/// before a new one is started.
const MAX_BLOCK_FILE_SIZE: u64 = 0x7800_0000; // ~2 GiB, matching upstream Bitcoin's cap.

/// The on-disk location of a block: which file it's in, and its byte offset
/// within that file (after the magic/length framing).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockFilePosition {
    pub file: u32,
    pub offset: u64,
}

/// Appends finalized blocks to numbered files under a network-scoped
/// directory, and reads them back by file position.
pub struct BlockStore {
    dir: PathBuf,
    magic: [u8; 4],
    current_file: u32,
    current_len: u64,
}

impl BlockStore {
    pub fn new(dir: PathBuf, network: Network) -> Result<Self, BoxError> {
        fs::create_dir_all(&dir)?;

        let current_file = latest_file_number(&dir)?;
        let current_len = file_path(&dir, current_file)
            .metadata()
            .map(|meta| meta.len())
            .unwrap_or(0);

        Ok(Self {
            dir,
            magic: network.magic(),
            current_file,
            current_len,
        })
    }

    /// Appends `block` to the current file, rolling over to a new numbered
    /// file first if it wouldn't fit under [`MAX_BLOCK_FILE_SIZE`].
    pub fn append(&mut self, block: &Block) -> Result<BlockFilePosition, BoxError> {
        let mut body = Vec::new();
        block.bitcoin_serialize(&mut body)?;

        let record_len = 4 + 4 + body.len() as u64;
        if self.current_len + record_len > MAX_BLOCK_FILE_SIZE && self.current_len > 0 {
            self.current_file += 1;
            self.current_len = 0;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path(&self.dir, self.current_file))?;

        let offset = self.current_len;
        file.write_all(&self.magic)?;
        file.write_all(&(body.len() as u32).to_le_bytes())?;
        file.write_all(&body)?;

        self.current_len += record_len;

        Ok(BlockFilePosition {
            file: self.current_file,
            offset,
        })
    }

    /// Reads the raw serialized block bytes at `position` back out, without
    /// parsing them (parsing is the caller's job -- this module only owns
    /// the file framing).
    pub fn read_raw(&self, position: BlockFilePosition) -> Result<Vec<u8>, BoxError> {
        let mut file = File::open(file_path(&self.dir, position.file))?;
        file.seek(SeekFrom::Start(position.offset))?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if magic != self.magic {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "block file magic mismatch").into());
        }

        let mut len_bytes = [0u8; 4];
        file.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        let mut body = vec![0u8; len];
        file.read_exact(&mut body)?;
        Ok(body)
    }
}

fn file_path(dir: &std::path::Path, number: u32) -> PathBuf {
    dir.join(format!("blk{:04}.dat", number))
}

/// Scans `dir` for the highest-numbered `blkNNNN.dat` file already present,
/// so restarting the node resumes appending rather than overwriting.
fn latest_file_number(dir: &std::path::Path) -> Result<u32, BoxError> {
    let mut highest = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if let Some(digits) = name.strip_prefix("blk").and_then(|rest| rest.strip_suffix(".dat")) {
            if let Ok(number) = digits.parse::<u32>() {
                highest = highest.max(number);
            }
        }
    }

    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::{
        amount::{Amount, NonNegative},
        block::{self, Header},
        transaction::{LockTime, Transaction},
        transparent::{CoinbaseData, Input, Output, Script},
        work::difficulty::CompactDifficulty,
    };
    use std::sync::Arc;

    fn sample_block() -> Block {
        let coinbase = Transaction::new(
            1,
            vec![Input::Coinbase {
                height: None,
                data: CoinbaseData(vec![0; 2]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(50_0000_0000).unwrap(),
                lock_script: Script(vec![]),
            }],
            LockTime::Height(block::Height(0)),
        );
        let transactions = vec![Arc::new(coinbase)];
        let merkle_root = block::merkle::Root::from_transactions(&transactions);

        Block {
            header: Header::new(
                1,
                block::Hash::from_bytes_exact([0; 32]),
                merkle_root,
                chrono::Utc::now(),
                CompactDifficulty(0x1d00ffff),
                0,
            ),
            transactions,
        }
    }

    #[test]
    fn appended_block_round_trips() {
        node_test::init();
        let dir = tempdir::TempDir::new("node-state-block-store").unwrap();
        let mut store = BlockStore::new(dir.path().to_path_buf(), Network::Mainnet).unwrap();

        let block = sample_block();
        let mut expected = Vec::new();
        block.bitcoin_serialize(&mut expected).unwrap();

        let position = store.append(&block).unwrap();
        let raw = store.read_raw(position).unwrap();

        assert_eq!(raw, expected);
    }
}
