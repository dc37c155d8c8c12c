//! K-mer packing and sequence-diff primitives.
//!
//! A k-mer is packed 2 bits/base into a `u64`, most-significant base first,
//! so that `k <= 32`. This module has no knowledge of path-nodes or the
//! arena; it operates purely on packed integers and byte slices.

use crate::error::{Result, SimplifierError};

/// Pack a single ASCII base into its 2-bit code.
///
/// Accepts upper- or lower-case `A`/`C`/`G`/`T`. Any other byte (including
/// `N`) is rejected rather than silently coerced to a sentinel value — this
/// engine never sees ambiguity codes, so encountering one means the upstream
/// evidence pipeline produced a malformed k-mer chain.
#[inline]
pub fn encode_base(base: u8) -> Result<u8> {
    match base.to_ascii_uppercase() {
        b'A' => Ok(0b00),
        b'C' => Ok(0b01),
        b'G' => Ok(0b10),
        b'T' => Ok(0b11),
        other => Err(SimplifierError::malformed(format!(
            "non-ACGT base byte {:#04x} in k-mer chain",
            other
        ))),
    }
}

/// Inverse of [`encode_base`].
#[inline]
pub fn decode_base(code: u8) -> u8 {
    match code & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b10 => b'G',
        _ => b'T',
    }
}

/// Pack a `k`-byte ASCII base sequence into a single 2-bit-per-base k-mer.
///
/// `k` must be in `1..=32` for the result to fit in a `u64`; this is
/// enforced by [`crate::config::SimplifierConfig::validate`] at the engine
/// boundary, not re-checked here.
pub fn pack_kmer(bases: &[u8], k: usize) -> Result<u64> {
    if bases.len() != k {
        return Err(SimplifierError::malformed(format!(
            "expected {} bases, got {}",
            k,
            bases.len()
        )));
    }
    let mut code: u64 = 0;
    for &b in bases {
        code = (code << 2) | encode_base(b)? as u64;
    }
    Ok(code)
}

/// Slide a k-mer one base to the right, dropping the leading base and
/// appending `next_base`.
#[inline]
pub fn push_base(kmer: u64, k: usize, next_base_code: u8) -> u64 {
    let mask = if k >= 32 { u64::MAX } else { (1u64 << (2 * k)) - 1 };
    ((kmer << 2) | next_base_code as u64) & mask
}

/// Decode a packed k-mer back into an ASCII base string.
pub fn kmer_to_string(kmer: u64, k: usize) -> String {
    let mut bases = vec![0u8; k];
    for i in 0..k {
        let shift = 2 * (k - 1 - i);
        bases[i] = decode_base(((kmer >> shift) & 0b11) as u8);
    }
    String::from_utf8(bases).expect("decode_base only ever emits ASCII")
}

/// Decode one path-node's k-mer chain into its underlying base sequence.
///
/// A chain of `L` k-mers of width `k` decodes to `L - 1 + k` bases: the
/// first k-mer contributes all `k` bases, and each subsequent k-mer (which
/// overlaps its predecessor by `k - 1` bases, since a path-node's chain is
/// an unbranched walk in the de Bruijn graph) contributes exactly one new
/// trailing base.
pub fn decode_chain(kmers: &[u64], k: usize) -> Vec<u8> {
    assert!(!kmers.is_empty(), "a path-node's k-mer chain is never empty");
    let mut bases = kmer_to_string(kmers[0], k).into_bytes();
    for &km in &kmers[1..] {
        bases.push(decode_base((km & 0b11) as u8));
    }
    bases
}

/// Concatenate the decoded base sequences of a root-to-tip sequence of
/// path-node chains into a single path sequence.
///
/// Each chain after the first has its leading `k - 1` bases dropped, since
/// they duplicate the trailing `k - 1` bases of the previous chain (the
/// edge between consecutive path-nodes is exactly that overlap). The result
/// is `total_kmer_count + k - 1` bases long, where `total_kmer_count` is the
/// sum of each chain's length, matching [`crate::cursor::PathTreeCursor::path_length`].
pub fn concat_path_bases<'a>(k: usize, chains: impl IntoIterator<Item = &'a [u64]>) -> Vec<u8> {
    let mut bases = Vec::new();
    for (i, chain) in chains.into_iter().enumerate() {
        let decoded = decode_chain(chain, k);
        if i == 0 {
            bases.extend_from_slice(&decoded);
        } else {
            bases.extend_from_slice(&decoded[(k - 1).min(decoded.len())..]);
        }
    }
    bases
}

/// Count base mismatches between two paths, aligned left-to-right.
///
/// `len_a`/`len_b` are the paths' total k-mer counts (see
/// [`crate::cursor::PathTreeCursor::path_length`]); the comparison window is
/// `min(len_a, len_b) + k - 1` bases.
pub fn bases_different(k: usize, bases_a: &[u8], len_a: usize, bases_b: &[u8], len_b: usize) -> usize {
    let window = len_a.min(len_b) + k - 1;
    let window = window.min(bases_a.len()).min(bases_b.len());
    bases_a[..window]
        .iter()
        .zip(bases_b[..window].iter())
        .filter(|(a, b)| a != b)
        .count()
}

/// Count base mismatches between two paths, aligned right-to-left.
///
/// Used for reverse (predecessor-direction) traversal, where the anchor
/// point is the tail of the decoded sequence rather than its head.
pub fn reverse_bases_different(
    k: usize,
    bases_a: &[u8],
    len_a: usize,
    bases_b: &[u8],
    len_b: usize,
) -> usize {
    let window = len_a.min(len_b) + k - 1;
    let window = window.min(bases_a.len()).min(bases_b.len());
    let tail_a = &bases_a[bases_a.len() - window..];
    let tail_b = &bases_b[bases_b.len() - window..];
    tail_a.iter().zip(tail_b.iter()).filter(|(a, b)| a != b).count()
}
