//! Double-SHA256, computed incrementally over serialized bytes.
//!
//! Every consensus-critical hash (block hash, txid, Merkle node) is a
//! double application of SHA-256. Rather than serializing a value to a
//! `Vec<u8>` and hashing it in a second pass, [`Writer`] implements
//! [`std::io::Write`] so `BitcoinSerialize` impls can feed it directly.

use std::io;

use sha2::{Digest, Sha256};

/// An `io::Write` sink that feeds bytes directly into a running SHA-256
/// state, so a type's `bitcoin_serialize` can compute its own hash without
/// allocating an intermediate buffer.
#[derive(Default)]
pub struct Writer(Sha256);

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Writer {
    /// Finishes the running hash and returns the double-SHA256 digest, in
    /// internal (little-endian) byte order.
    pub fn finish(self) -> [u8; 32] {
        let first = self.0.finalize();
        let second = Sha256::digest(&first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        out
    }
}

/// Computes the double-SHA256 digest of `data` in one call.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let mut writer = Writer::default();
    io::Write::write_all(&mut writer, data).expect("writer is infallible");
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_incremental_writes() {
        node_test::init();
        let whole = sha256d(b"hello world");

        let mut writer = Writer::default();
        io::Write::write_all(&mut writer, b"hello ").unwrap();
        io::Write::write_all(&mut writer, b"world").unwrap();
        let incremental = writer.finish();

        assert_eq!(whole, incremental);
    }
}
