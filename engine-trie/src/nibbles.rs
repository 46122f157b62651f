/// Expands `bytes` into one nibble per element, high nibble first.
#[must_use]
pub fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles
}

/// Hex-prefix encoding of a nibble path (yellow paper appendix C).
///
/// The first nibble carries two flags: bit 1 marks a leaf, bit 0 marks an
/// odd-length path. Odd paths pack their first nibble into the flag byte.
#[must_use]
pub fn hex_prefix_encode(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd = nibbles.len() % 2 == 1;
    let mut flag = if is_leaf { 0x20 } else { 0x00 };
    let mut out = Vec::with_capacity(1 + nibbles.len() / 2);

    let rest = if odd {
        flag |= 0x10 | nibbles[0];
        &nibbles[1..]
    } else {
        nibbles
    };
    out.push(flag);

    for pair in rest.chunks_exact(2) {
        out.push((pair[0] << 4) | pair[1]);
    }
    out
}

/// Length of the longest common prefix of two nibble paths.
#[must_use]
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
