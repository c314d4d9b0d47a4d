use proptest::prelude::*;

use crate::serialization::{BitcoinDeserialize, BitcoinDeserializeInto, BitcoinSerialize};

use super::{Input, OutPoint, Output};

proptest! {
    #[test]
    fn outpoint_roundtrip(outpoint in any::<OutPoint>()) {
        node_test::init();

        let bytes = outpoint.bitcoin_serialize_to_vec()?;
        let other: OutPoint = bytes.bitcoin_deserialize_into()?;

        prop_assert_eq![outpoint, other];
    }

    #[test]
    fn input_roundtrip(input in any::<Input>()) {
        node_test::init();

        let bytes = input.bitcoin_serialize_to_vec()?;
        let other: Input = bytes.bitcoin_deserialize_into()?;

        prop_assert_eq![input, other];
    }

    #[test]
    fn output_roundtrip(output in any::<Output>()) {
        node_test::init();

        let bytes = output.bitcoin_serialize_to_vec()?;
        let other: Output = bytes.bitcoin_deserialize_into()?;

        prop_assert_eq![output, other];
    }
}
