//! 计划形状哈希
//!
//! 把已执行计划树渲染成只含结构信息的 JSON 文档（节点类型、父子关系、
//! 目标关系名与别名、嵌套顺序），不含任何计时与行数字段，再对文档做
//! 32 位哈希。同一计划形状的重复执行得到相同的计划 id。

use serde_json::{json, Map, Value};

use crate::core::hash::{murmurhash2, DEFAULT_SEED};
use crate::core::PlanError;
use crate::query::plan::walker::{walk_children, Edge, EdgeFilter};
use crate::query::plan::{NodeKind, PlanNode, RangeIndex, RangeTable};

/// 计划 id
pub type PlanId = u32;

/// 渲染结构文档
pub fn render_plan_shape(root: &PlanNode, rtable: &RangeTable) -> Result<Value, PlanError> {
    let plan = render_node(root, None, rtable)?;
    Ok(json!({ "Plan": plan }))
}

/// 计算计划形状哈希
pub fn hash_plan_shape(root: &PlanNode, rtable: &RangeTable) -> Result<PlanId, PlanError> {
    let document = render_plan_shape(root, rtable)?.to_string();
    log::trace!("normalized plan: {}", document);
    Ok(murmurhash2(document.as_bytes(), DEFAULT_SEED))
}

fn render_node(
    node: &PlanNode,
    edge: Option<Edge>,
    rtable: &RangeTable,
) -> Result<Value, PlanError> {
    let mut obj = Map::new();
    obj.insert("Node Type".to_string(), json!(node.kind.node_type_name()));
    if let Some(edge) = edge {
        obj.insert("Parent Relationship".to_string(), json!(edge.relationship()));
    }

    match &node.kind {
        NodeKind::Scan { scanrelid, .. } => {
            insert_relation(&mut obj, *scanrelid, rtable)?;
        }
        NodeKind::ModifyTable {
            nominal_relation, ..
        } => {
            insert_relation(&mut obj, *nominal_relation, rtable)?;
        }
        NodeKind::ForeignScan { relids } | NodeKind::CustomScan { relids } => {
            if let [single] = relids.as_slice() {
                insert_relation(&mut obj, *single, rtable)?;
            } else {
                let names = relids
                    .iter()
                    .map(|&rti| rtable.get(rti).map(|e| e.refname.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                obj.insert("Relations".to_string(), json!(names));
            }
        }
        NodeKind::BitmapIndexScan { index_name } => {
            obj.insert("Index Name".to_string(), json!(index_name));
        }
        NodeKind::Join { .. }
        | NodeKind::Composite { .. }
        | NodeKind::Gather { .. }
        | NodeKind::Other { .. } => {}
    }

    let mut children = Vec::new();
    let mut failure = None;
    walk_children(node, EdgeFilter::All, |edge, child| {
        match render_node(child, Some(edge), rtable) {
            Ok(rendered) => {
                children.push(rendered);
                false
            }
            Err(e) => {
                failure = Some(e);
                true
            }
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }
    if !children.is_empty() {
        obj.insert("Plans".to_string(), Value::Array(children));
    }

    Ok(Value::Object(obj))
}

fn insert_relation(
    obj: &mut Map<String, Value>,
    rti: RangeIndex,
    rtable: &RangeTable,
) -> Result<(), PlanError> {
    let entry = rtable.get(rti)?;
    if let Some(relation) = &entry.relation {
        obj.insert("Relation Name".to_string(), json!(relation));
    }
    obj.insert("Alias".to_string(), json!(entry.refname));
    Ok(())
}
