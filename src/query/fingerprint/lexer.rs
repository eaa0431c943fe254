//! 字面量词法扫描
//!
//! 解析器给出的字面量位置可能不带长度，这里按 SQL 词法补齐 token 长度；
//! 对没有解析器的调用方，`scan_literals` 直接在文本中找出字面量位置。
//! 所有偏移均为字节偏移。

use crate::query::statement::LiteralLocation;

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}

fn peek(b: &[u8], i: usize) -> Option<u8> {
    b.get(i).copied()
}

/// 从 `offset` 开始的字面量 token 长度；无法识别或未闭合时返回 None
pub fn literal_token_len(text: &str, offset: usize) -> Option<usize> {
    let b = text.as_bytes();
    let c = peek(b, offset)?;

    match c {
        b'\'' => quoted_len(b, offset, false),
        b'$' => match peek(b, offset + 1) {
            Some(d) if d.is_ascii_digit() => Some(1 + digits_len(b, offset + 1)),
            _ => dollar_quoted_len(b, offset),
        },
        b'-' | b'+' => {
            let next = offset + 1;
            if starts_number(b, next) {
                Some(1 + number_len(b, next))
            } else {
                None
            }
        }
        _ if starts_number(b, offset) => Some(number_len(b, offset)),
        b'E' | b'e' if peek(b, offset + 1) == Some(b'\'') => {
            quoted_len(b, offset + 1, true).map(|n| n + 1)
        }
        b'B' | b'b' | b'X' | b'x' | b'N' | b'n' if peek(b, offset + 1) == Some(b'\'') => {
            quoted_len(b, offset + 1, false).map(|n| n + 1)
        }
        b'U' | b'u' if peek(b, offset + 1) == Some(b'&') && peek(b, offset + 2) == Some(b'\'') => {
            quoted_len(b, offset + 2, false).map(|n| n + 2)
        }
        _ if is_ident_start(c) => Some(word_len(b, offset)),
        _ => None,
    }
}

fn starts_number(b: &[u8], i: usize) -> bool {
    match peek(b, i) {
        Some(d) if d.is_ascii_digit() => true,
        Some(b'.') => matches!(peek(b, i + 1), Some(d) if d.is_ascii_digit()),
        _ => false,
    }
}

fn digits_len(b: &[u8], start: usize) -> usize {
    b[start..].iter().take_while(|c| c.is_ascii_digit()).count()
}

fn word_len(b: &[u8], start: usize) -> usize {
    b[start..].iter().take_while(|&&c| is_ident_char(c)).count()
}

fn number_len(b: &[u8], start: usize) -> usize {
    let mut i = start + digits_len(b, start);
    if peek(b, i) == Some(b'.') {
        i += 1;
        i += digits_len(b, i);
    }
    if matches!(peek(b, i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(peek(b, j), Some(b'+') | Some(b'-')) {
            j += 1;
        }
        if matches!(peek(b, j), Some(d) if d.is_ascii_digit()) {
            i = j + digits_len(b, j);
        }
    }
    i - start
}

fn quoted_len(b: &[u8], start: usize, backslash_escapes: bool) -> Option<usize> {
    let mut i = start + 1;
    while i < b.len() {
        match b[i] {
            b'\\' if backslash_escapes => i += 2,
            b'\'' => {
                if peek(b, i + 1) == Some(b'\'') {
                    i += 2;
                } else {
                    return Some(i + 1 - start);
                }
            }
            _ => i += 1,
        }
    }
    None
}

fn dollar_quoted_len(b: &[u8], start: usize) -> Option<usize> {
    let tag_body = &b[start + 1..];
    if let Some(&first) = tag_body.first() {
        if first != b'$' && !(first.is_ascii_alphabetic() || first == b'_' || first >= 0x80) {
            return None;
        }
    }
    let tag_len = tag_body.iter().position(|&c| c == b'$')?;
    if !tag_body[..tag_len]
        .iter()
        .all(|&c| c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80)
    {
        return None;
    }
    let tag = &b[start..start + tag_len + 2];
    let body_start = start + tag.len();
    let close = b[body_start..]
        .windows(tag.len())
        .position(|w| w == tag)?;
    Some(body_start + close + tag.len() - start)
}

// 其后跟表达式的关键字，已排序；这些词之后的 `-` 是一元负号
const OPERATOR_KEYWORDS: &[&str] = &[
    "all", "and", "any", "as", "between", "by", "case", "else", "escape", "fetch", "having",
    "ilike", "in", "is", "like", "limit", "not", "offset", "on", "or", "return", "returning",
    "select", "set", "similar", "some", "then", "using", "values", "when", "where", "with",
];

fn is_operator_keyword(word: &str) -> bool {
    OPERATOR_KEYWORDS
        .binary_search(&word.to_ascii_lowercase().as_str())
        .is_ok()
}

/// 在查询文本中找出所有字面量（数字、字符串、位串、美元引用串、参数标记）
///
/// 紧贴数字的一元负号并入字面量，`id = -5` 与 `id = 5` 规范化结果相同；
/// 前一个 token 是操作数（标识符、字面量、`)`、`]`）时 `-` 是二元减号。
pub fn scan_literals(text: &str) -> Vec<LiteralLocation> {
    let b = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    let mut after_operand = false;

    while i < b.len() {
        let c = b[i];
        match c {
            b'-' if peek(b, i + 1) == Some(b'-') => {
                i = b[i..]
                    .iter()
                    .position(|&c| c == b'\n')
                    .map_or(b.len(), |p| i + p + 1);
            }
            b'/' if peek(b, i + 1) == Some(b'*') => {
                i = b[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(b.len(), |p| i + 2 + p + 2);
            }
            b'-' if !after_operand && starts_number(b, i + 1) => {
                let len = 1 + number_len(b, i + 1);
                out.push(LiteralLocation::span(i, len));
                i += len;
                after_operand = true;
            }
            b'"' => {
                let mut j = i + 1;
                while j < b.len() {
                    if b[j] == b'"' {
                        if peek(b, j + 1) == Some(b'"') {
                            j += 2;
                            continue;
                        }
                        break;
                    }
                    j += 1;
                }
                i = j + 1;
                after_operand = true;
            }
            b'\'' | b'$' => match literal_token_len(text, i) {
                Some(len) => {
                    out.push(LiteralLocation::span(i, len));
                    i += len;
                    after_operand = true;
                }
                None => {
                    i += 1;
                    after_operand = false;
                }
            },
            _ if starts_number(b, i) => {
                let len = number_len(b, i);
                out.push(LiteralLocation::span(i, len));
                i += len;
                after_operand = true;
            }
            _ if is_ident_start(c) => {
                let len = word_len(b, i);
                let prefixed = matches!(peek(b, i + len), Some(b'\''))
                    && matches!(&b[i..i + len], b"E" | b"e" | b"B" | b"b" | b"X" | b"x" | b"N" | b"n");
                let unicode = len == 1
                    && matches!(c, b'U' | b'u')
                    && peek(b, i + 1) == Some(b'&')
                    && peek(b, i + 2) == Some(b'\'');
                after_operand = text
                    .get(i..i + len)
                    .map_or(true, |word| !is_operator_keyword(word));
                if prefixed || unicode {
                    if let Some(lit_len) = literal_token_len(text, i) {
                        out.push(LiteralLocation::span(i, lit_len));
                        i += lit_len;
                        continue;
                    }
                }
                i += len;
            }
            _ if c.is_ascii_whitespace() => i += 1,
            b')' | b']' => {
                after_operand = true;
                i += 1;
            }
            _ => {
                after_operand = false;
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lengths() {
        assert_eq!(literal_token_len("x = 123 AND", 4), Some(3));
        assert_eq!(literal_token_len("1.5e-3)", 0), Some(6));
        assert_eq!(literal_token_len("'it''s' x", 0), Some(7));
        assert_eq!(literal_token_len("E'a\\'b'", 0), Some(7));
        assert_eq!(literal_token_len("$1, $22", 4), Some(3));
        assert_eq!(literal_token_len("$q$a'b$q$ z", 0), Some(9));
        assert_eq!(literal_token_len("-42", 0), Some(3));
        assert_eq!(literal_token_len("'open", 0), None);
        assert_eq!(literal_token_len("TRUE)", 0), Some(4));
    }

    #[test]
    fn test_scan_skips_identifiers_and_comments() {
        let sql = "SELECT t1.c2 FROM \"t 3\" -- 99\nWHERE a = 10 /* 'x' */ AND b = 'y'";
        let found: Vec<_> = scan_literals(sql)
            .into_iter()
            .map(|loc| &sql[loc.offset..loc.offset + loc.len.unwrap_or(0)])
            .collect();
        assert_eq!(found, vec!["10", "'y'"]);
    }

    #[test]
    fn test_scan_prefixed_strings_and_params() {
        let sql = "SELECT X'1F', E'a', $1, $$body$$";
        let found: Vec<_> = scan_literals(sql)
            .into_iter()
            .map(|loc| &sql[loc.offset..loc.offset + loc.len.unwrap_or(0)])
            .collect();
        assert_eq!(found, vec!["X'1F'", "E'a'", "$1", "$$body$$"]);
    }

    fn literals(sql: &str) -> Vec<&str> {
        scan_literals(sql)
            .into_iter()
            .map(|loc| &sql[loc.offset..loc.offset + loc.len.unwrap_or(0)])
            .collect()
    }

    #[test]
    fn test_operator_keywords_sorted() {
        let mut sorted = OPERATOR_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, OPERATOR_KEYWORDS);
    }

    #[test]
    fn test_unary_minus_joins_literal() {
        assert_eq!(literals("WHERE id = -5"), vec!["-5"]);
        assert_eq!(literals("SELECT -1.5, (-2)"), vec!["-1.5", "-2"]);
        assert_eq!(literals("IN (1,-3)"), vec!["1", "-3"]);
        assert_eq!(literals("WHERE a BETWEEN -1 AND -2 LIMIT 3"), vec!["-1", "-2", "3"]);
    }

    #[test]
    fn test_binary_minus_stays_operator() {
        assert_eq!(literals("SELECT a-5"), vec!["5"]);
        assert_eq!(literals("SELECT 3-5"), vec!["3", "5"]);
        assert_eq!(literals("SELECT (a)-5, b[1]-2"), vec!["5", "1", "2"]);
        assert_eq!(literals("SELECT \"x\"-5"), vec!["5"]);
        assert_eq!(literals("SELECT a - -5"), vec!["-5"]);
    }
}
