//! 查询指纹模块
//!
//! 把原始查询文本规范化为与字面量无关的文本（每个字面量替换为单个 `?`），
//! 并计算：
//! - 128 位指纹摘要：规范化文本的仓库键
//! - 32 位查询 id：折叠空白后的规范化文本哈希，写入历史记录
//!
//! 没有字面量位置元数据或不是承载计划的语句时不产生指纹，
//! 调用方据此跳过本次反馈。

pub mod lexer;

use serde::{Deserialize, Serialize};

use crate::core::hash::{fingerprint_digest, murmurhash2, Digest128, DEFAULT_SEED};
use crate::query::statement::{LiteralLocation, QuerySource, Statement};

pub use lexer::{literal_token_len, scan_literals};

/// 字面量占位符
pub const PLACEHOLDER: char = '?';

/// 查询指纹
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFingerprint {
    /// 规范化后的查询文本
    pub normalized: String,
    /// 规范化文本的 128 位摘要
    pub digest: Digest128,
    /// 查询文本的 32 位哈希
    pub query_id: u32,
}

impl QueryFingerprint {
    pub fn hash_hex(&self) -> String {
        self.digest.to_hex()
    }
}

/// 查询指纹计算器
#[derive(Debug, Clone, Default)]
pub struct QueryFingerprinter;

impl QueryFingerprinter {
    pub fn new() -> Self {
        Self
    }

    /// 把字面量位置上的 token 替换为占位符，返回规范化文本及其摘要
    pub fn normalize(&self, raw: &str, locations: &[LiteralLocation]) -> (String, Digest128) {
        let normalized = replace_literals(raw, locations);
        let digest = fingerprint_digest(&normalized);
        (normalized, digest)
    }

    /// 为查询源计算指纹；没有字面量位置元数据时返回 None
    pub fn fingerprint(&self, source: &QuerySource) -> Option<QueryFingerprint> {
        let locations = source.literal_locations.as_deref()?;
        let span = statement_span(source)?;

        // 位置是相对整个文本的，换算到语句内
        let relative: Vec<LiteralLocation> = locations
            .iter()
            .filter(|loc| loc.offset >= source.stmt_location)
            .map(|loc| LiteralLocation {
                offset: loc.offset - source.stmt_location,
                len: loc.len,
            })
            .collect();

        let (normalized, digest) = self.normalize(span, &relative);
        let query_id = query_id(&normalized);
        Some(QueryFingerprint {
            normalized,
            digest,
            query_id,
        })
    }

    /// 先解析出承载计划的目标语句，再计算指纹
    pub fn fingerprint_statement(
        &self,
        statement: &Statement,
        source: &QuerySource,
    ) -> Option<QueryFingerprint> {
        let target = statement.resolve_target(source)?;
        self.fingerprint(target)
    }
}

fn statement_span(source: &QuerySource) -> Option<&str> {
    let text = source.text.as_str();
    let end = source
        .stmt_len
        .map(|len| source.stmt_location.saturating_add(len))
        .unwrap_or(text.len())
        .min(text.len());
    text.get(source.stmt_location..end)
}

/// 按位置替换字面量；越界、重叠或不在字符边界上的位置被忽略
fn replace_literals(text: &str, locations: &[LiteralLocation]) -> String {
    let mut spans: Vec<(usize, usize)> = locations
        .iter()
        .filter(|loc| loc.offset < text.len())
        .filter_map(|loc| {
            let len = loc.len.or_else(|| literal_token_len(text, loc.offset))?;
            Some((loc.offset, loc.offset.saturating_add(len).min(text.len())))
        })
        .collect();
    spans.sort_unstable();
    spans.dedup_by_key(|span| span.0);

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in spans {
        if start < last || end <= start {
            continue;
        }
        let (Some(prefix), Some(_)) = (text.get(last..start), text.get(start..end)) else {
            continue;
        };
        out.push_str(prefix);
        out.push(PLACEHOLDER);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// 折叠引号外的连续空白并去掉首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quote = false;
    let mut pending_space = false;

    for c in text.trim().chars() {
        if !in_quote && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '\'' {
            in_quote = !in_quote;
        }
        out.push(c);
    }
    out
}

/// 查询文本的 32 位哈希，对空白布局不敏感
pub fn query_id(normalized: &str) -> u32 {
    murmurhash2(collapse_whitespace(normalized).as_bytes(), DEFAULT_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> QuerySource {
        QuerySource::new(text, scan_literals(text))
    }

    #[test]
    fn test_literal_values_do_not_change_fingerprint() {
        let fp = QueryFingerprinter::new();
        let a = fp.fingerprint(&source("SELECT * FROM t WHERE id = 1")).expect("指纹");
        let b = fp.fingerprint(&source("SELECT * FROM t WHERE id = 999")).expect("指纹");
        assert_eq!(a.normalized, "SELECT * FROM t WHERE id = ?");
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_literal_shares_fingerprint() {
        let fp = QueryFingerprinter::new();
        let positive = fp.fingerprint(&source("SELECT * FROM t WHERE id = 5")).expect("指纹");
        let negative = fp.fingerprint(&source("SELECT * FROM t WHERE id = -5")).expect("指纹");
        assert_eq!(negative.normalized, "SELECT * FROM t WHERE id = ?");
        assert_eq!(positive.digest, negative.digest);

        let minus = fp.fingerprint(&source("SELECT a-5 FROM t")).expect("指纹");
        assert_eq!(minus.normalized, "SELECT a-? FROM t");
    }

    #[test]
    fn test_oversized_length_is_clamped() {
        let fp = QueryFingerprinter::new();
        let (normalized, _) = fp.normalize("SELECT 1", &[LiteralLocation::span(7, usize::MAX)]);
        assert_eq!(normalized, "SELECT ?");
    }

    #[test]
    fn test_missing_locations_skip() {
        let fp = QueryFingerprinter::new();
        assert!(fp.fingerprint(&QuerySource::without_locations("SELECT 1")).is_none());
    }

    #[test]
    fn test_empty_locations_keep_text() {
        let fp = QueryFingerprinter::new();
        let f = fp.fingerprint(&QuerySource::new("SELECT now()", vec![])).expect("指纹");
        assert_eq!(f.normalized, "SELECT now()");
    }

    #[test]
    fn test_lengths_filled_in_and_duplicates_ignored() {
        let fp = QueryFingerprinter::new();
        let text = "SELECT 'a''b', 42";
        let locs = vec![
            LiteralLocation::at(15),
            LiteralLocation::at(7),
            LiteralLocation::at(7),
        ];
        let (normalized, _) = fp.normalize(text, &locs);
        assert_eq!(normalized, "SELECT ?, ?");
    }

    #[test]
    fn test_statement_span_respected() {
        let fp = QueryFingerprinter::new();
        let text = "SELECT 1; SELECT * FROM t WHERE x = 5; SELECT 2";
        let mut src = QuerySource::new(text, scan_literals(text));
        src.stmt_location = 10;
        src.stmt_len = Some(27);
        let f = fp.fingerprint(&src).expect("指纹");
        assert_eq!(f.normalized, "SELECT * FROM t WHERE x = ?");
    }

    #[test]
    fn test_query_id_ignores_whitespace_layout() {
        assert_eq!(
            query_id("SELECT *\n  FROM t WHERE a = ?"),
            query_id("SELECT * FROM t   WHERE a = ?")
        );
        assert_ne!(query_id("SELECT 'a  b'"), query_id("SELECT 'a b'"));
    }
}
