//! Property-based tests for the transport framing checksum.

use proptest::prelude::*;
use wslink_ws28xx_protocol::{open_frame, seal_frame, CodecError, MAX_FRAME_SIZE};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// A sealed buffer always opens back to the original payload.
    #[test]
    fn prop_seal_open_identity(payload in proptest::collection::vec(any::<u8>(), 0..=MAX_FRAME_SIZE - 2)) {
        let mut out = [0u8; MAX_FRAME_SIZE];
        let n = seal_frame(&payload, &mut out);
        prop_assert_eq!(n, payload.len() + 2);
        let opened = open_frame(&out[..n]).expect("own seal opens");
        prop_assert_eq!(opened, &payload[..]);
    }

    /// Flipping any single bit of a sealed buffer is always detected.
    #[test]
    fn prop_any_bit_flip_detected(
        payload in proptest::collection::vec(any::<u8>(), 1..=MAX_FRAME_SIZE - 2),
        flip_byte_seed in any::<usize>(),
        bit in 0u8..8,
    ) {
        let mut out = [0u8; MAX_FRAME_SIZE];
        let n = seal_frame(&payload, &mut out);
        let flip_byte = flip_byte_seed % n;
        out[flip_byte] ^= 1 << bit;
        prop_assert!(
            matches!(open_frame(&out[..n]), Err(CodecError::Checksum { .. })),
            "bit flip not detected as a checksum error"
        );
    }
}
