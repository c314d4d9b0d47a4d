//! Bridges the miner's synchronous `ConnectInputs` scratch pool to the
//! buffered `StateService` client, which only answers async requests.

use node_chain::transaction::Hash as TxHash;
use node_chain::transparent::OutPoint;
use node_consensus::{PreviousOutput, PreviousOutputLookup};
use node_state::service::{Request, Response};
use tower::buffer::Buffer;
use tower::ServiceExt;

/// Looks up confirmed outputs through a cloned `StateService` client.
/// `mark_spent` is a no-op: the persisted UTXO set is never mutated by a
/// candidate block under construction, only the scratch pool layered on top
/// of it is.
pub struct ChainLookup {
    client: Buffer<node_state::StateService, Request>,
}

impl ChainLookup {
    pub fn new(client: Buffer<node_state::StateService, Request>) -> Self {
        ChainLookup { client }
    }
}

impl PreviousOutputLookup for ChainLookup {
    fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput> {
        let client = self.client.clone();
        let outpoint = *outpoint;
        let response = futures::executor::block_on(client.oneshot(Request::Utxo(outpoint)));
        match response {
            Ok(Response::MaybeUtxo(Some(utxo))) => Some(PreviousOutput {
                output: utxo.output,
                is_coinbase: utxo.from_coinbase,
                height: utxo.height,
                spent: false,
            }),
            _ => None,
        }
    }

    fn mark_spent(&mut self, _outpoint: &OutPoint, _spender: TxHash) {}
}
