/// The wire-level message types, commands, and codec.
///
/// Everything here mirrors what actually crosses the socket. Turning a
/// parsed `Message` into chain/mempool/wallet effects is the dispatcher's
/// job, not this crate's.
pub mod external;
