//! 范围表与 EXPLAIN 风格的关系命名
//!
//! 只有预扫描中实际被引用的关系才会分配显示名；同名关系（例如自连接）
//! 依次追加 `_1`、`_2` 后缀消歧。未分配显示名的关系回退到声明的引用名。

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::node::RangeIndex;
use crate::core::PlanError;

/// 范围表项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeTableEntry {
    /// 声明的引用名（未写别名时即关系名）
    pub refname: String,
    /// 查询中显式书写的别名
    #[serde(default)]
    pub alias: Option<String>,
    /// 底层关系名（非表关系为空）
    #[serde(default)]
    pub relation: Option<String>,
}

impl RangeTableEntry {
    pub fn relation(name: &str) -> Self {
        Self {
            refname: name.to_string(),
            alias: None,
            relation: Some(name.to_string()),
        }
    }

    pub fn aliased(relation: &str, alias: &str) -> Self {
        Self {
            refname: alias.to_string(),
            alias: Some(alias.to_string()),
            relation: Some(relation.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable {
    entries: Vec<RangeTableEntry>,
}

impl RangeTable {
    pub fn new(entries: Vec<RangeTableEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, rti: RangeIndex) -> Result<&RangeTableEntry, PlanError> {
        rti.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or(PlanError::InvalidRangeIndex {
                index: rti,
                len: self.entries.len(),
            })
    }
}

/// 本次生成使用的关系显示名
#[derive(Debug, Clone)]
pub struct RelationNames {
    assigned: Vec<Option<String>>,
    fallback: Vec<String>,
}

impl RelationNames {
    /// 为预扫描得到的关系集合分配唯一显示名
    pub fn assign(rtable: &RangeTable, used: &BTreeSet<RangeIndex>) -> Result<Self, PlanError> {
        if let Some(&bad) = used.iter().find(|&&rti| rtable.get(rti).is_err()) {
            return Err(PlanError::InvalidRangeIndex {
                index: bad,
                len: rtable.len(),
            });
        }

        let mut taken: HashSet<String> = HashSet::new();
        let mut assigned = Vec::with_capacity(rtable.len());

        for (i, entry) in rtable.entries.iter().enumerate() {
            if !used.contains(&(i + 1)) {
                assigned.push(None);
                continue;
            }
            let base = entry.alias.clone().unwrap_or_else(|| entry.refname.clone());
            let mut candidate = base.clone();
            let mut suffix = 0;
            while taken.contains(&candidate) {
                suffix += 1;
                candidate = format!("{}_{}", base, suffix);
            }
            taken.insert(candidate.clone());
            assigned.push(Some(candidate));
        }

        Ok(Self {
            assigned,
            fallback: rtable.entries.iter().map(|e| e.refname.clone()).collect(),
        })
    }

    /// 关系的显示名：优先使用分配的名字，否则回退到引用名
    pub fn name(&self, rti: RangeIndex) -> Result<&str, PlanError> {
        let idx = rti.checked_sub(1).filter(|&i| i < self.fallback.len()).ok_or(
            PlanError::InvalidRangeIndex {
                index: rti,
                len: self.fallback.len(),
            },
        )?;
        Ok(self.assigned[idx]
            .as_deref()
            .unwrap_or(self.fallback[idx].as_str()))
    }

    /// 按范围表顺序，以空格连接的关系名列表
    pub fn join_names(&self, relids: &BTreeSet<RangeIndex>) -> Result<String, PlanError> {
        let names = relids
            .iter()
            .map(|&rti| self.name(rti))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names.join(" "))
    }
}

// 需要加引号的关键字（保留字、类型/函数名关键字、列名关键字），已排序
const QUOTED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "between", "bigint", "binary", "bit", "boolean", "both", "case", "cast",
    "char", "character", "check", "coalesce", "collate", "collation", "column", "concurrently",
    "constraint", "create", "cross", "current_catalog", "current_date", "current_role",
    "current_schema", "current_time", "current_timestamp", "current_user", "dec", "decimal",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "exists",
    "extract", "false", "fetch", "float", "for", "foreign", "freeze", "from", "full", "grant",
    "greatest", "group", "grouping", "having", "ilike", "in", "initially", "inner", "inout",
    "int", "integer", "intersect", "interval", "into", "is", "isnull", "join", "lateral",
    "leading", "least", "left", "like", "limit", "localtime", "localtimestamp", "national",
    "natural", "nchar", "none", "not", "notnull", "null", "nullif", "numeric", "offset", "on",
    "only", "or", "order", "out", "outer", "overlaps", "overlay", "placing", "position",
    "precision", "primary", "real", "references", "returning", "right", "row", "select",
    "session_user", "setof", "similar", "smallint", "some", "substring", "symmetric", "table",
    "tablesample", "then", "time", "timestamp", "to", "trailing", "treat", "trim", "true",
    "union", "unique", "user", "using", "values", "varchar", "variadic", "verbose", "when",
    "where", "window", "with",
];

/// 按 SQL 标识符规则在必要时加双引号
pub fn quote_identifier(ident: &str) -> Cow<'_, str> {
    let mut chars = ident.chars();
    let safe = match chars.next() {
        Some(first) => {
            (first.is_ascii_lowercase() || first == '_')
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        }
        None => false,
    };

    if safe && QUOTED_KEYWORDS.binary_search(&ident).is_err() {
        return Cow::Borrowed(ident);
    }
    Cow::Owned(format!("\"{}\"", ident.replace('"', "\"\"")))
}
