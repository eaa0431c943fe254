//! 语句分类
//!
//! 判断一次执行是否为 ANALYZE 风格的请求，并找出真正承载计划的目标语句。
//! EXPLAIN、CREATE TABLE AS、DECLARE CURSOR 包装的语句逐层展开，
//! EXECUTE 使用预编译语句自身的源文本。纯工具命令没有可指纹化的查询。

use serde::{Deserialize, Serialize};

/// 字面量在源文本中的位置（字节偏移）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiteralLocation {
    pub offset: usize,
    /// 字面量 token 长度；缺省时由词法扫描补齐
    #[serde(default)]
    pub len: Option<usize>,
}

impl LiteralLocation {
    pub fn at(offset: usize) -> Self {
        Self { offset, len: None }
    }

    pub fn span(offset: usize, len: usize) -> Self {
        Self {
            offset,
            len: Some(len),
        }
    }
}

/// 客户端提交的查询文本及解析器给出的元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySource {
    pub text: String,
    /// 语句在多语句文本中的起始偏移
    #[serde(default)]
    pub stmt_location: usize,
    /// 语句长度；缺省表示到文本末尾
    #[serde(default)]
    pub stmt_len: Option<usize>,
    /// 字面量位置；None 表示解析器没有提供这类元数据
    #[serde(default)]
    pub literal_locations: Option<Vec<LiteralLocation>>,
}

impl QuerySource {
    pub fn new(text: &str, literal_locations: Vec<LiteralLocation>) -> Self {
        Self {
            text: text.to_string(),
            stmt_location: 0,
            stmt_len: None,
            literal_locations: Some(literal_locations),
        }
    }

    /// 没有字面量位置元数据的源文本
    pub fn without_locations(text: &str) -> Self {
        Self {
            text: text.to_string(),
            stmt_location: 0,
            stmt_len: None,
            literal_locations: None,
        }
    }
}

/// 预编译语句
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedStatement {
    pub name: String,
    pub source: QuerySource,
    pub statement: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "statement", rename_all = "snake_case")]
pub enum Statement {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Explain {
        #[serde(default)]
        analyze: bool,
        target: Box<Statement>,
    },
    DeclareCursor {
        target: Box<Statement>,
    },
    CreateTableAs {
        target: Box<Statement>,
    },
    /// 预编译语句不存在时为 None
    Execute {
        #[serde(default)]
        prepared: Option<PreparedStatement>,
    },
    Utility {
        command: String,
    },
}

impl Statement {
    pub fn explain_analyze(target: Statement) -> Self {
        Statement::Explain {
            analyze: true,
            target: Box::new(target),
        }
    }

    /// 顶层是否为带 ANALYZE 选项的 EXPLAIN
    pub fn is_analyze_request(&self) -> bool {
        matches!(self, Statement::Explain { analyze: true, .. })
    }

    /// 找出承载计划的查询源文本；纯工具命令返回 None
    pub fn resolve_target<'a>(&'a self, source: &'a QuerySource) -> Option<&'a QuerySource> {
        match self {
            Statement::Select
            | Statement::Insert
            | Statement::Update
            | Statement::Delete
            | Statement::Merge => Some(source),
            Statement::Explain { target, .. }
            | Statement::DeclareCursor { target }
            | Statement::CreateTableAs { target } => target.resolve_target(source),
            Statement::Execute { prepared } => prepared
                .as_ref()
                .and_then(|p| p.statement.resolve_target(&p.source)),
            Statement::Utility { command } => {
                log::debug!("工具命令没有可指纹化的查询: {}", command);
                None
            }
        }
    }
}
