//! Predicate-driven lane compaction.
//!
//! For every 8-bit selection mask the table lists the selected lane
//! positions in ascending order. Vectors wider than eight lanes are
//! compacted one 8-lane group at a time.

/// `COMPRESS_LUT[m][..m.count_ones()]` are the set bit positions of `m`.
pub static COMPRESS_LUT: [[u8; 8]; 256] = build_compress_lut();

const fn build_compress_lut() -> [[u8; 8]; 256] {
    let mut table = [[0u8; 8]; 256];
    let mut mask = 0;
    while mask < 256 {
        let mut out = 0;
        let mut bit = 0;
        while bit < 8 {
            if mask & (1 << bit) != 0 {
                table[mask][out] = bit as u8;
                out += 1;
            }
            bit += 1;
        }
        mask += 1;
    }
    table
}

/// Copies `lanes[i]` for every set bit `i` of `mask` to the front of `dst`.
///
/// `dst` must have room for `mask.count_ones()` elements.
#[inline]
pub fn compress_store<T: Copy>(lanes: &[T], mask: u64, dst: &mut [T]) -> usize {
    let mut written = 0;
    for (group, chunk) in lanes.chunks(8).enumerate() {
        let selection = ((mask >> (group * 8)) & 0xFF) as usize;
        if selection == 0 {
            continue;
        }
        let count = selection.count_ones() as usize;
        for &position in &COMPRESS_LUT[selection][..count] {
            dst[written] = chunk[position as usize];
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_entries() {
        assert_eq!(COMPRESS_LUT[0b0000_0001][0], 0);
        assert_eq!(&COMPRESS_LUT[0b1010_0100][..3], &[2, 5, 7]);
        assert_eq!(COMPRESS_LUT[0xFF], [0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_every_mask_lists_set_bits() {
        for mask in 0..256usize {
            let count = mask.count_ones() as usize;
            let mut rebuilt = 0usize;
            for &p in &COMPRESS_LUT[mask][..count] {
                rebuilt |= 1 << p;
            }
            assert_eq!(rebuilt, mask);
        }
    }

    #[test]
    fn test_compress_across_groups() {
        let lanes: Vec<u16> = (0..16).collect();
        let mut dst = [0u16; 16];
        let n = compress_store(&lanes, 0b1000_0000_0000_0011, &mut dst);
        assert_eq!(&dst[..n], &[0, 1, 15]);
    }

    #[test]
    fn test_compress_short_vector() {
        let lanes = [7u64, 8];
        let mut dst = [0u64; 1];
        assert_eq!(compress_store(&lanes, 0b10, &mut dst), 1);
        assert_eq!(dst, [8]);
    }
}
