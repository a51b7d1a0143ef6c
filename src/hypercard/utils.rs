//! Small numeric helpers shared by the checksum and bitmap code.

/// Rotates a 32-bit value right by 3 bits.
///
/// Used by the LIST and PAGE rolling checksums.
pub fn rotate_right_3_bits(value: u32) -> u32 {
    value.rotate_right(3)
}

/// Rounds `value` down to a multiple of `multiple`, towards negative infinity.
pub fn down_to_multiple(value: i32, multiple: i32) -> i32 {
    value - value.rem_euclid(multiple)
}

/// Rounds `value` up to a multiple of `multiple`, towards positive infinity.
pub fn up_to_multiple(value: i32, multiple: i32) -> i32 {
    down_to_multiple(value + multiple - 1, multiple)
}
