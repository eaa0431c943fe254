//! 哈希工具
//!
//! - `murmurhash2`：32 位非加密哈希，用于查询文本 id 与计划形状 id
//! - `fingerprint_digest`：128 位摘要（blake3 截断），用作规范化查询的仓库键

use std::fmt;

use serde::{Deserialize, Serialize};

const M: u32 = 0x5bd1e995;
const R: u8 = 24;

/// 查询 id / 计划 id 使用的默认种子
pub const DEFAULT_SEED: u32 = 0;

/// Compute MurmurHash2 for byte data with a given seed
pub fn murmurhash2(data: &[u8], seed: u32) -> u32 {
    let mut h: u32 = seed ^ (data.len() as u32);
    let mut chunks = data.chunks_exact(4);

    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M) ^ k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^ (h >> 15)
}

/// 128 位指纹摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest128(pub [u8; 16]);

impl Digest128 {
    /// 十六进制表示（32 个字符），作为仓库中的文本键
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// 从十六进制文本解析
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 32 || !hex.is_ascii() {
            return None;
        }
        let mut out = [0u8; 16];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Digest128(out))
    }
}

impl fmt::Display for Digest128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// 计算文本的 128 位摘要
pub fn fingerprint_digest(text: &str) -> Digest128 {
    let hash = blake3::hash(text.as_bytes());
    let mut out = [0u8; 16];
    out.copy_from_slice(&hash.as_bytes()[..16]);
    Digest128(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmurhash2_consistency() {
        let data = b"SELECT * FROM t WHERE id = ?";
        assert_eq!(murmurhash2(data, DEFAULT_SEED), murmurhash2(data, DEFAULT_SEED));
    }

    #[test]
    fn test_murmurhash2_tail_lengths_differ() {
        let a = murmurhash2(b"abcd", 0);
        let b = murmurhash2(b"abcde", 0);
        let c = murmurhash2(b"abcdef", 0);
        let d = murmurhash2(b"abcdefg", 0);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(c, d);
    }

    #[test]
    fn test_murmurhash2_seed_matters() {
        assert_ne!(murmurhash2(b"plan", 0), murmurhash2(b"plan", 1));
    }

    #[test]
    fn test_digest_hex_roundtrip() {
        let digest = fingerprint_digest("SELECT ?");
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(Digest128::from_hex(&hex), Some(digest));
        assert_eq!(Digest128::from_hex("zz"), None);
    }
}
