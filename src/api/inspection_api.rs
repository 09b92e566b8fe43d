// ==========================================
// 车队轮胎管理系统 - 巡检 API
// ==========================================
// 职责: 巡检表单解析、调用巡检记录器、查询巡检历史
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::assignment_api::{non_blank, require_id};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::inspection::TireInspection;
use crate::domain::types::RecommendedAction;
use crate::engine::{BulkInspectionRequest, BulkInspectionResult, InspectionRecorder, InspectionRequest};
use crate::repository::InspectionRepository;

/// 巡检表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectionForm {
    pub tire_id: String,
    pub position_id: String,
    pub odometer: i64,
    pub inspector_id: String,
    pub driver_id: Option<String>,
    pub tread_depth: f64,
    pub pressure: f64,
    pub wear_type_id: String,
    pub work_order_id: Option<String>,
    pub recommended_action: Option<String>,
    pub actor: String,
}

impl InspectionForm {
    pub fn into_request(self) -> ApiResult<InspectionRequest> {
        if self.odometer < 0 {
            return Err(ApiError::InvalidInput(format!("里程不能为负: {}", self.odometer)));
        }
        if !self.tread_depth.is_finite() || self.tread_depth < 0.0 {
            return Err(ApiError::InvalidInput(format!("花纹深度无效: {}", self.tread_depth)));
        }
        if !self.pressure.is_finite() || self.pressure < 0.0 {
            return Err(ApiError::InvalidInput(format!("气压无效: {}", self.pressure)));
        }
        let recommended_action = match non_blank(self.recommended_action) {
            Some(raw) => Some(
                RecommendedAction::from_str(&raw)
                    .ok_or_else(|| ApiError::InvalidInput(format!("未知的建议动作: {}", raw)))?,
            ),
            None => None,
        };

        Ok(InspectionRequest {
            tire_id: require_id("tire_id", &self.tire_id)?,
            position_id: require_id("position_id", &self.position_id)?,
            work_order_id: non_blank(self.work_order_id),
            inspection_odometer: self.odometer,
            inspector_id: require_id("inspector_id", &self.inspector_id)?,
            driver_id: non_blank(self.driver_id),
            tread_depth: self.tread_depth,
            pressure: self.pressure,
            wear_type_id: require_id("wear_type_id", &self.wear_type_id)?,
            recommended_action,
            inspected_at: None,
            actor: if self.actor.trim().is_empty() {
                "system".to_string()
            } else {
                self.actor
            },
        })
    }
}

// ==========================================
// InspectionApi - 巡检 API
// ==========================================
pub struct InspectionApi {
    recorder: Arc<InspectionRecorder>,
    inspection_repo: Arc<InspectionRepository>,
}

impl InspectionApi {
    pub fn new(recorder: Arc<InspectionRecorder>, inspection_repo: Arc<InspectionRepository>) -> Self {
        Self {
            recorder,
            inspection_repo,
        }
    }

    pub fn create_inspection(&self, form: InspectionForm) -> ApiResult<TireInspection> {
        let request = form.into_request()?;
        Ok(self.recorder.create_inspection(&request)?)
    }

    pub fn update_inspection(&self, inspection_id: &str, form: InspectionForm) -> ApiResult<TireInspection> {
        let inspection_id = require_id("inspection_id", inspection_id)?;
        let request = form.into_request()?;
        Ok(self.recorder.update_inspection(&inspection_id, &request)?)
    }

    /// 整车批量巡检
    pub fn bulk_inspect_vehicle(&self, request: &BulkInspectionRequest) -> ApiResult<BulkInspectionResult> {
        if request.readings.is_empty() {
            return Err(ApiError::InvalidInput("批量巡检至少需要一条读数".to_string()));
        }
        Ok(self.recorder.bulk_inspect_vehicle(request)?)
    }

    pub fn list_for_tire(&self, tire_id: &str) -> ApiResult<Vec<TireInspection>> {
        Ok(self.inspection_repo.list_by_tire(tire_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> InspectionForm {
        InspectionForm {
            tire_id: "T1".to_string(),
            position_id: "P1".to_string(),
            odometer: 58_000,
            inspector_id: "E1".to_string(),
            tread_depth: 14.5,
            pressure: 105.0,
            wear_type_id: "W".to_string(),
            recommended_action: Some("rotate".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_form_parses_action() {
        let request = form().into_request().unwrap();
        assert_eq!(request.recommended_action, Some(RecommendedAction::Rotate));
        assert_eq!(request.work_order_id, None);
    }

    #[test]
    fn test_form_rejects_negative_readings() {
        let mut bad = form();
        bad.tread_depth = -1.0;
        assert!(matches!(bad.into_request(), Err(ApiError::InvalidInput(_))));

        let mut bad = form();
        bad.recommended_action = Some("explode".to_string());
        assert!(matches!(bad.into_request(), Err(ApiError::InvalidInput(_))));
    }
}
