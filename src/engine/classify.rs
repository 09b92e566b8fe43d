// ==========================================
// 车队轮胎管理系统 - 分配操作分类
// ==========================================
// 职责: 由提交字段判定 NEW_MOUNT / MOVE / DISCARD（纯函数，不访问存储）
// 规则: 报废标记或 DISCARD 占位任一成立即为报废，且目标轮位强制置空
// ==========================================

use crate::domain::types::OperationKind;
use crate::engine::error::Precondition;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const NEW_MOUNT_SENTINEL: &str = "NEW_MOUNT";
pub const DISCARD_SENTINEL: &str = "DISCARD";

// ==========================================
// PositionRef - 轮位引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionRef {
    NewMount,
    Discard,
    Position(String),
}

impl PositionRef {
    /// 解析调用方输入；空白视为未填写
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case(NEW_MOUNT_SENTINEL) {
            Some(PositionRef::NewMount)
        } else if trimmed.eq_ignore_ascii_case(DISCARD_SENTINEL) {
            Some(PositionRef::Discard)
        } else {
            Some(PositionRef::Position(trimmed.to_string()))
        }
    }

    pub fn position_id(&self) -> Option<&str> {
        match self {
            PositionRef::Position(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

// ==========================================
// AssignmentRequest - 分配请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub tire_id: String,
    pub from_position: Option<PositionRef>,
    pub to_position: Option<PositionRef>,
    pub work_order_id: String,
    pub inspection_id: Option<String>,
    pub assignment_date: Option<NaiveDate>, // 缺省取当天
    pub start_odometer: Option<i64>,        // 缺省取工单里程
    pub end_odometer: Option<i64>,
    pub removal_date: Option<NaiveDate>, // 报废缺省取 assignment_date
    pub reason_for_removal: Option<String>,
    pub notes: Option<String>,
    pub discard: bool,
    pub actor: String,
}

impl AssignmentRequest {
    /// 去除首尾空白后的拆卸原因（空串视为未填写）
    pub fn removal_reason(&self) -> Option<&str> {
        self.reason_for_removal
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// ==========================================
// ClassifiedOperation - 分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedOperation {
    NewMount { to_position_id: String },
    Move { from_position_id: String, to_position_id: String },
    Discard { from_position_id: String },
}

impl ClassifiedOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            ClassifiedOperation::NewMount { .. } => OperationKind::NewMount,
            ClassifiedOperation::Move { .. } => OperationKind::Move,
            ClassifiedOperation::Discard { .. } => OperationKind::Discard,
        }
    }

    pub fn from_position_id(&self) -> Option<&str> {
        match self {
            ClassifiedOperation::NewMount { .. } => None,
            ClassifiedOperation::Move { from_position_id, .. }
            | ClassifiedOperation::Discard { from_position_id } => Some(from_position_id),
        }
    }

    pub fn to_position_id(&self) -> Option<&str> {
        match self {
            ClassifiedOperation::NewMount { to_position_id }
            | ClassifiedOperation::Move { to_position_id, .. } => Some(to_position_id),
            ClassifiedOperation::Discard { .. } => None,
        }
    }
}

/// 判定操作类型
///
/// # 规则
/// - DISCARD 只能出现在目标位，NEW_MOUNT 只能出现在源位
/// - 报废优先：discard_flag 或目标为 DISCARD，此时必须有源轮位
/// - 源位缺省或为 NEW_MOUNT → 新胎装车；否则为换位，且源/目标不能相同
pub fn classify(
    from: Option<&PositionRef>,
    to: Option<&PositionRef>,
    discard_flag: bool,
) -> Result<ClassifiedOperation, Precondition> {
    if matches!(from, Some(PositionRef::Discard)) {
        return Err(Precondition::InvalidSentinel {
            sentinel: DISCARD_SENTINEL.to_string(),
            slot: "from_position".to_string(),
        });
    }
    if matches!(to, Some(PositionRef::NewMount)) {
        return Err(Precondition::InvalidSentinel {
            sentinel: NEW_MOUNT_SENTINEL.to_string(),
            slot: "to_position".to_string(),
        });
    }

    let from_id = from.and_then(PositionRef::position_id);

    if discard_flag || matches!(to, Some(PositionRef::Discard)) {
        return match from_id {
            Some(id) => Ok(ClassifiedOperation::Discard {
                from_position_id: id.to_string(),
            }),
            None => Err(Precondition::MissingSource),
        };
    }

    let to_id = match to.and_then(PositionRef::position_id) {
        Some(id) => id,
        None => return Err(Precondition::MissingDestination),
    };

    match from_id {
        None => Ok(ClassifiedOperation::NewMount {
            to_position_id: to_id.to_string(),
        }),
        Some(from_id) if from_id == to_id => Err(Precondition::SamePosition {
            position_id: to_id.to_string(),
        }),
        Some(from_id) => Ok(ClassifiedOperation::Move {
            from_position_id: from_id.to_string(),
            to_position_id: to_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(id: &str) -> PositionRef {
        PositionRef::Position(id.to_string())
    }

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(PositionRef::parse(" new_mount "), Some(PositionRef::NewMount));
        assert_eq!(PositionRef::parse("DISCARD"), Some(PositionRef::Discard));
        assert_eq!(PositionRef::parse("P-7"), Some(pos("P-7")));
        assert_eq!(PositionRef::parse("   "), None);
    }

    #[test]
    fn test_new_mount_from_sentinel_or_absent() {
        let op = classify(Some(&PositionRef::NewMount), Some(&pos("P1")), false).unwrap();
        assert_eq!(op.kind(), OperationKind::NewMount);
        assert_eq!(op.to_position_id(), Some("P1"));

        let op = classify(None, Some(&pos("P1")), false).unwrap();
        assert_eq!(op.kind(), OperationKind::NewMount);
    }

    #[test]
    fn test_move_and_same_position() {
        let op = classify(Some(&pos("P1")), Some(&pos("P2")), false).unwrap();
        assert_eq!(
            op,
            ClassifiedOperation::Move {
                from_position_id: "P1".to_string(),
                to_position_id: "P2".to_string()
            }
        );

        let err = classify(Some(&pos("P1")), Some(&pos("P1")), false).unwrap_err();
        assert!(matches!(err, Precondition::SamePosition { .. }));
    }

    #[test]
    fn test_discard_takes_precedence_and_drops_destination() {
        // 标记为报废时即使提交了目标轮位也被忽略
        let op = classify(Some(&pos("P1")), Some(&pos("P2")), true).unwrap();
        assert_eq!(op.kind(), OperationKind::Discard);
        assert_eq!(op.to_position_id(), None);

        let op = classify(Some(&pos("P1")), Some(&PositionRef::Discard), false).unwrap();
        assert_eq!(op.kind(), OperationKind::Discard);
    }

    #[test]
    fn test_invalid_combinations() {
        assert_eq!(
            classify(Some(&PositionRef::NewMount), Some(&PositionRef::Discard), false).unwrap_err(),
            Precondition::MissingSource
        );
        assert_eq!(classify(Some(&pos("P1")), None, false).unwrap_err(), Precondition::MissingDestination);
        assert!(matches!(
            classify(Some(&PositionRef::Discard), Some(&pos("P1")), false).unwrap_err(),
            Precondition::InvalidSentinel { .. }
        ));
        assert!(matches!(
            classify(Some(&pos("P1")), Some(&PositionRef::NewMount), false).unwrap_err(),
            Precondition::InvalidSentinel { .. }
        ));
    }
}
