// ==========================================
// 车队轮胎管理系统 - 轮胎分配记录领域模型
// ==========================================
// 对齐: tire_assignment 表
// ==========================================
// | from | to  | discard | 含义     |
// | 空   | 有  | false   | 新胎装车 |
// | 有   | 有  | false   | 换位     |
// | 有   | 空  | true    | 报废     |
// ==========================================

use crate::domain::types::OperationKind;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// TireAssignment - 分配记录（状态迁移日志）
// ==========================================
// 红线: 报废记录为终态，不允许修改/删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireAssignment {
    pub assignment_id: String,
    pub tire_id: String,
    pub from_position_id: Option<String>,
    pub to_position_id: Option<String>,
    pub is_discard: bool,
    pub work_order_id: String,
    pub inspection_id: Option<String>,

    pub assignment_date: NaiveDate,
    pub start_odometer: i64,
    pub end_odometer: Option<i64>,
    pub removal_date: Option<NaiveDate>,
    pub reason_for_removal: String,
    pub notes: String,

    // 迁移前的轮胎状态，用于删除回滚
    pub status_before_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl TireAssignment {
    pub fn kind(&self) -> OperationKind {
        OperationKind::from_record(
            self.from_position_id.is_some(),
            self.to_position_id.is_some(),
            self.is_discard,
        )
    }

    pub fn is_discard(&self) -> bool {
        self.kind() == OperationKind::Discard
    }
}
