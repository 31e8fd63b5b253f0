// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Returns `num / den`, rounded up, for a non-negative `num` and positive `den`.
#[inline]
pub(crate) const fn div_ceil(num: i32, den: i32) -> i32 {
    debug_assert!(den > 0, "div_ceil requires a positive divisor");
    let q = num / den;
    if q * den < num { q + 1 } else { q }
}
