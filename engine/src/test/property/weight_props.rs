//! Round-trip property of the weight layout transform: unpacking the
//! packed buffer with the documented inverse recovers the offset-shifted
//! weights exactly, for any 8-bit tensor shape the classifier admits.

use proptest::prelude::*;

use crate::WEIGHT_BITS;
use crate::test::helpers::decode;
use crate::weight::encode;

/// Weight tensors the accelerator path accepts: 1x1 or 3x3 kernels,
/// int8-range values.
fn weight_tensor() -> impl Strategy<Value = (Vec<i32>, [usize; 4], bool)> {
    (1usize..=8, 1usize..=40, prop::bool::ANY, prop::bool::ANY).prop_flat_map(
        |(cout, cin, three_by_three, depthwise)| {
            let k = if three_by_three { 3 } else { 1 };
            let dims = [cout, cin, k, k];
            let len = cout * cin * k * k;
            (prop::collection::vec(-128i32..=127, len), Just(dims), Just(depthwise))
        },
    )
}

proptest! {
    #[test]
    fn round_trip_recovers_shifted_weights((values, dims, depthwise) in weight_tensor()) {
        let encoded = encode(&values, dims, WEIGHT_BITS, depthwise);
        prop_assert_eq!(encoded.offset, values.iter().copied().min().unwrap());

        let decoded = decode(&encoded, dims, WEIGHT_BITS, depthwise);
        let shifted: Vec<i32> = values.iter().map(|v| v - encoded.offset).collect();
        prop_assert_eq!(decoded, shifted);
    }

    #[test]
    fn packed_size_is_shape_product((values, dims, depthwise) in weight_tensor()) {
        let encoded = encode(&values, dims, WEIGHT_BITS, depthwise);
        prop_assert_eq!(encoded.data.len(), encoded.shape.iter().product::<usize>());
    }
}
