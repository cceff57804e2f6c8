//! Bit-exact weight layout transform.
//!
//! Packs a dense (cout, cin, kh, kw) weight tensor into the accelerator's
//! native bit-plane format. The hardware performs no validation at runtime:
//! a single misplaced bit silently corrupts accelerator output, so the
//! ordering below must be reproduced exactly.
//!
//! Layout, outermost to innermost:
//! (cout, cinMajor, bit-plane, spatial position row-major over kh x kw,
//! cin-subtile lane packed 8-per-byte in little bit order).
//!
//! The reported shape differs by kernel size:
//! - 1x1: (cout, cinMajor, 32) - one packed byte column per subtile
//! - otherwise: (cout, cinMajor, bits, 36) - 288 bits per bit-plane row

#[cfg(test)]
use smallvec::SmallVec;
use smallvec::smallvec;

use okto_graph::Shape;

use crate::CIN_SUBTILE;

/// Result of the weight layout transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedWeights {
    /// Packed bytes, row-major over `shape`.
    pub data: Vec<u8>,
    pub shape: Shape,
    /// Minimum of the raw weights, subtracted before packing so the packed
    /// values start at zero. The caller records this on the node for
    /// numeric compensation during requantization.
    pub offset: i32,
}

/// Pack `values` of shape `dims = (cout, cin, kh, kw)` into the native
/// weight format.
///
/// For the depthwise data path the hardware iterates the cout/cin roles in
/// the opposite order, so the two axes are swapped before packing.
///
/// Stateless and total over any 8-bit-valued tensor: after offset
/// subtraction only the low `bit_width` bits of each element are packed,
/// matching the hardware's view of the data.
pub fn encode(values: &[i32], dims: [usize; 4], bit_width: usize, depthwise: bool) -> EncodedWeights {
    debug_assert_eq!(values.len(), dims.iter().product::<usize>());

    let [dim_cout, dim_cin, kh, kw] = dims;
    // Step 1: depthwise swaps the roles of the two leading axes.
    let (cout, cin) = if depthwise { (dim_cin, dim_cout) } else { (dim_cout, dim_cin) };

    // Step 2: translate so the minimum becomes zero.
    let offset = values.iter().copied().min().unwrap_or(0);

    // Element lookup in the swapped, offset-shifted view. `values` stays
    // row-major over the original (cout, cin, kh, kw).
    let fetch = |o: usize, c: usize, s: usize| -> u8 {
        let (y, x) = (s / kw, s % kw);
        let (orig_o, orig_c) = if depthwise { (c, o) } else { (o, c) };
        let idx = ((orig_o * dim_cin + orig_c) * kh + y) * kw + x;
        let shifted = values[idx] - offset;
        (shifted & ((1i32 << bit_width) - 1)) as u8
    };

    // Step 3: zero-pad cin up to the next subtile boundary.
    let subtile = CIN_SUBTILE;
    let cin_major = cin.div_ceil(subtile);
    let spatial = kh * kw;

    // Steps 4-6: walk the output layout directly and gather bits. Lane
    // index runs innermost so consecutive runs of 8 lanes pack into bytes
    // in little bit order.
    let mut data = Vec::with_capacity(cout * cin_major * bit_width * spatial * subtile / 8);
    for o in 0..cout {
        for major in 0..cin_major {
            for plane in 0..bit_width {
                for s in 0..spatial {
                    for lane_byte in 0..subtile / 8 {
                        let mut byte = 0u8;
                        for bit in 0..8 {
                            let c = major * subtile + lane_byte * 8 + bit;
                            // Padding lanes stay zero.
                            if c < cin {
                                let lane = (fetch(o, c, s) >> plane) & 1;
                                byte |= lane << bit;
                            }
                        }
                        data.push(byte);
                    }
                }
            }
        }
    }

    // Step 7: the 1x1 path fills exactly one byte column per subtile; the
    // 3x3 path reports one 288-bit row per bit plane.
    let shape: Shape = if kh == 1 && kw == 1 {
        smallvec![cout, cin_major, subtile]
    } else {
        smallvec![cout, cin_major, bit_width, spatial * subtile / 8]
    };
    debug_assert_eq!(data.len(), shape.iter().product::<usize>());

    EncodedWeights { data, shape, offset }
}

/// Row-major dimensions of the packed buffer before the final reshape,
/// shared by both kernel paths. Used by the documented inverse in tests.
#[cfg(test)]
pub(crate) fn packed_dims(cout: usize, cin: usize, spatial: usize, bit_width: usize) -> SmallVec<[usize; 5]> {
    smallvec![cout, cin.div_ceil(CIN_SUBTILE), bit_width, spatial, CIN_SUBTILE / 8]
}
