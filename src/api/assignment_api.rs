// ==========================================
// 车队轮胎管理系统 - 轮胎分配 API
// ==========================================
// 职责: 扁平表单 → AssignmentRequest（占位标记解析、日期解析），调用分配引擎
// 说明: 序列号/车牌等人工输入需由调用方先解析为 ID
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::assignment::TireAssignment;
use crate::engine::{AssignmentEngine, AssignmentRequest, PositionRef};
use crate::repository::AssignmentRepository;

/// 分配表单（create/update 共用）
///
/// from_position_ref 可为轮位 ID 或 NEW_MOUNT；to_position_ref 可为轮位 ID 或 DISCARD
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentForm {
    pub tire_id: String,
    pub from_position_ref: Option<String>,
    pub to_position_ref: Option<String>,
    pub work_order_id: String,
    pub inspection_id: Option<String>,
    pub assignment_date: Option<String>, // YYYY-MM-DD
    pub start_odometer: Option<i64>,
    pub end_odometer: Option<i64>,
    pub removal_date: Option<String>, // YYYY-MM-DD
    pub reason_for_removal: Option<String>,
    pub notes: Option<String>,
    pub discard_flag: Option<bool>,
    pub actor: String,
}

impl AssignmentForm {
    /// 解析为引擎请求
    pub fn into_request(self) -> ApiResult<AssignmentRequest> {
        let tire_id = require_id("tire_id", &self.tire_id)?;
        let work_order_id = require_id("work_order_id", &self.work_order_id)?;

        Ok(AssignmentRequest {
            tire_id,
            from_position: self.from_position_ref.as_deref().and_then(PositionRef::parse),
            to_position: self.to_position_ref.as_deref().and_then(PositionRef::parse),
            work_order_id,
            inspection_id: non_blank(self.inspection_id),
            assignment_date: parse_date("assignment_date", self.assignment_date.as_deref())?,
            start_odometer: self.start_odometer,
            end_odometer: self.end_odometer,
            removal_date: parse_date("removal_date", self.removal_date.as_deref())?,
            reason_for_removal: self.reason_for_removal,
            notes: self.notes,
            discard: self.discard_flag.unwrap_or(false),
            actor: if self.actor.trim().is_empty() {
                "system".to_string()
            } else {
                self.actor
            },
        })
    }
}

pub(crate) fn require_id(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_date(field: &str, raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| ApiError::InvalidInput(format!("{}日期格式错误({}): {}", field, s, e))),
        None => Ok(None),
    }
}

// ==========================================
// AssignmentApi - 轮胎分配 API
// ==========================================
pub struct AssignmentApi {
    engine: Arc<AssignmentEngine>,
    assignment_repo: Arc<AssignmentRepository>,
}

impl AssignmentApi {
    pub fn new(engine: Arc<AssignmentEngine>, assignment_repo: Arc<AssignmentRepository>) -> Self {
        Self {
            engine,
            assignment_repo,
        }
    }

    /// 创建分配（新胎装车/换位/报废）
    pub fn create_assignment(&self, form: AssignmentForm) -> ApiResult<TireAssignment> {
        let request = form.into_request()?;
        Ok(self.engine.create_assignment(&request)?)
    }

    /// 修改分配（报废记录不可修改）
    pub fn update_assignment(&self, assignment_id: &str, form: AssignmentForm) -> ApiResult<TireAssignment> {
        let assignment_id = require_id("assignment_id", assignment_id)?;
        let request = form.into_request()?;
        Ok(self.engine.update_assignment(&assignment_id, &request)?)
    }

    /// 删除分配并回滚状态
    pub fn delete_assignment(&self, assignment_id: &str, actor: &str) -> ApiResult<()> {
        let assignment_id = require_id("assignment_id", assignment_id)?;
        Ok(self.engine.delete_assignment(&assignment_id, actor)?)
    }

    pub fn get_assignment(&self, assignment_id: &str) -> ApiResult<TireAssignment> {
        self.assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("TireAssignment(id={})不存在", assignment_id)))
    }

    pub fn list_for_tire(&self, tire_id: &str) -> ApiResult<Vec<TireAssignment>> {
        Ok(self.assignment_repo.list_by_tire(tire_id)?)
    }
}
