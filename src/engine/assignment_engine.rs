// ==========================================
// 车队轮胎管理系统 - 轮胎分配引擎
// ==========================================
// 职责: 执行一次原子状态迁移（新胎装车 / 换位 / 报废），以及修改、删除回滚
// 输入: AssignmentRequest
// 输出: TireAssignment（不可变迁移日志）+ 轮胎/轮位/巡检的一致更新
// ==========================================
// 红线: 轮胎.current_position_id = P ⇔ P.mounted_tire_id = 该轮胎
// 红线: 全部校验先于任何写入；任一步失败整体回滚
// 并发: BEGIN IMMEDIATE + 轮位 CAS + 轮胎 revision 乐观锁
// ==========================================

use crate::config::{AssignmentPolicy, FleetConfigReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::assignment::TireAssignment;
use crate::domain::tire::{Tire, TireStatus};
use crate::domain::types::OperationKind;
use crate::domain::vehicle::TirePosition;
use crate::domain::work_order::WorkOrder;
use crate::engine::classify::{classify, AssignmentRequest, ClassifiedOperation, PositionRef};
use crate::engine::error::{EngineError, EngineResult, Precondition};
use crate::engine::work_order_gate::WorkOrderGate;
use crate::engine::{begin_immediate, lock_conn};
use crate::repository::{
    ActionLogRepository, AssignmentRepository, InspectionRepository, TirePlacementUpdate, TireRepository,
    VehicleRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// ==========================================
// AssignmentEngine - 轮胎分配引擎
// ==========================================
pub struct AssignmentEngine {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn FleetConfigReader>,
}

impl AssignmentEngine {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn FleetConfigReader>) -> Self {
        Self { conn, config }
    }

    fn load_policy(&self) -> EngineResult<AssignmentPolicy> {
        self.config
            .assignment_policy()
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    // ==========================================
    // 新增
    // ==========================================

    /// 创建分配记录
    ///
    /// # 流程
    /// 1. 分类（纯函数）
    /// 2. 校验工单、轮胎、巡检、轮位
    /// 3. 腾位 → 占位 → 写记录 → 更新轮胎 → 重定向巡检 → 审计
    pub fn create_assignment(&self, request: &AssignmentRequest) -> EngineResult<TireAssignment> {
        // 配置读取与连接共用同一把锁，须在加锁前完成
        let policy = self.load_policy()?;

        let result = classify_request(request).and_then(|op| {
            debug!(tire_id = %request.tire_id, kind = %op.kind(), "分配操作已分类");
            let mut conn = lock_conn(&self.conn)?;
            let tx = begin_immediate(&mut conn)?;
            let assignment = create_tx(&tx, request, &op, &policy)?;
            tx.commit()?;
            Ok(assignment)
        });

        match &result {
            Ok(a) => info!(
                assignment_id = %a.assignment_id,
                tire_id = %a.tire_id,
                kind = %a.kind(),
                "分配已提交"
            ),
            Err(e) => warn!(tire_id = %request.tire_id, error = %e, "分配被拒绝"),
        }
        result
    }

    // ==========================================
    // 修改
    // ==========================================

    /// 修改分配记录（仅限轮胎最新的一条非报废记录）
    ///
    /// # 不可变字段
    /// - tire_id / from_position_id / 操作类型
    ///
    /// # 目标轮位变更
    /// 新目标必须为空；旧目标腾位，新目标占位，轮胎与巡检随之重定向
    pub fn update_assignment(
        &self,
        assignment_id: &str,
        request: &AssignmentRequest,
    ) -> EngineResult<TireAssignment> {
        let policy = self.load_policy()?;

        let result = (|| -> EngineResult<TireAssignment> {
            let mut conn = lock_conn(&self.conn)?;
            let tx = begin_immediate(&mut conn)?;
            let assignment = update_tx(&tx, assignment_id, request, &policy)?;
            tx.commit()?;
            Ok(assignment)
        })();

        match &result {
            Ok(a) => info!(assignment_id = %a.assignment_id, tire_id = %a.tire_id, "分配记录已修改"),
            Err(e) => warn!(assignment_id = %assignment_id, error = %e, "分配记录修改被拒绝"),
        }
        result
    }

    // ==========================================
    // 删除（含状态回滚）
    // ==========================================

    /// 删除分配记录并回滚其造成的状态
    ///
    /// # 限制
    /// - 只能删除轮胎最新的一条记录
    /// - 报废记录为终态，不允许删除
    ///
    /// # 回滚
    /// 目标轮位腾空、源轮位重新占用、轮胎位置/状态/last_assignment 恢复、巡检迁回源轮位
    pub fn delete_assignment(&self, assignment_id: &str, actor: &str) -> EngineResult<()> {
        let result = (|| -> EngineResult<()> {
            let mut conn = lock_conn(&self.conn)?;
            let tx = begin_immediate(&mut conn)?;
            delete_tx(&tx, assignment_id, actor)?;
            tx.commit()?;
            Ok(())
        })();

        match &result {
            Ok(()) => info!(assignment_id = %assignment_id, "分配记录已删除并回滚"),
            Err(e) => warn!(assignment_id = %assignment_id, error = %e, "分配记录删除被拒绝"),
        }
        result
    }
}

fn classify_request(request: &AssignmentRequest) -> EngineResult<ClassifiedOperation> {
    classify(
        request.from_position.as_ref(),
        request.to_position.as_ref(),
        request.discard,
    )
    .map_err(EngineError::from)
}

fn requests_discard(request: &AssignmentRequest) -> bool {
    request.discard || matches!(request.to_position, Some(PositionRef::Discard))
}

// ==========================================
// 事务内加载与校验
// ==========================================

fn load_tire(conn: &Connection, tire_id: &str) -> EngineResult<Tire> {
    TireRepository::find_tx(conn, tire_id)?.ok_or_else(|| EngineError::not_found("Tire", tire_id))
}

fn load_position(conn: &Connection, position_id: &str) -> EngineResult<TirePosition> {
    VehicleRepository::find_position_tx(conn, position_id)?
        .ok_or_else(|| EngineError::not_found("TirePosition", position_id))
}

fn load_status(conn: &Connection, status_id: &str) -> EngineResult<TireStatus> {
    TireRepository::find_status_tx(conn, status_id)?.ok_or_else(|| EngineError::not_found("TireStatus", status_id))
}

fn require_not_scrapped(tire: &Tire) -> EngineResult<()> {
    if tire.is_scrapped {
        return Err(Precondition::TireScrapped {
            tire_id: tire.tire_id.clone(),
        }
        .into());
    }
    Ok(())
}

fn require_holds(position: &TirePosition, tire_id: &str) -> EngineResult<()> {
    if !position.holds(tire_id) {
        return Err(Precondition::TireNotInSourcePosition {
            tire_id: tire_id.to_string(),
            position_id: position.position_id.clone(),
        }
        .into());
    }
    Ok(())
}

fn require_empty(position: &TirePosition) -> EngineResult<()> {
    if position.is_occupied() {
        return Err(Precondition::PositionOccupied {
            position_id: position.position_id.clone(),
        }
        .into());
    }
    Ok(())
}

/// 关联巡检必须属于同一轮胎
fn check_inspection(conn: &Connection, inspection_id: Option<&str>, tire_id: &str) -> EngineResult<()> {
    let inspection_id = match inspection_id {
        Some(id) => id,
        None => return Ok(()),
    };
    let inspection = InspectionRepository::find_tx(conn, inspection_id)?
        .ok_or_else(|| EngineError::not_found("TireInspection", inspection_id))?;
    if inspection.tire_id != tire_id {
        return Err(Precondition::InspectionTireMismatch {
            inspection_id: inspection_id.to_string(),
            inspection_tire_id: inspection.tire_id,
            tire_id: tire_id.to_string(),
        }
        .into());
    }
    Ok(())
}

/// 工单授权
///
/// - 跨车换位: 工单属于源车辆，且目标车辆另有 OPENED 工单
/// - 其他: require_vehicle_match 开启时，工单属于被操作轮位所在车辆
fn authorize(
    conn: &Connection,
    order: &WorkOrder,
    from: Option<&TirePosition>,
    to: Option<&TirePosition>,
    policy: &AssignmentPolicy,
) -> EngineResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from.vehicle_id != to.vehicle_id => {
            WorkOrderGate::require_vehicle(order, &from.vehicle_id)?;
            WorkOrderGate::require_destination_authorized(conn, &to.vehicle_id, &order.work_order_id)
        }
        (Some(touched), _) | (None, Some(touched)) => {
            if policy.require_vehicle_match {
                WorkOrderGate::require_vehicle(order, &touched.vehicle_id)?;
            }
            Ok(())
        }
        (None, None) => Ok(()),
    }
}

/// CAS 腾位；未命中说明并发写入已改变轮位
fn vacate(conn: &Connection, position_id: &str, tire_id: &str) -> EngineResult<()> {
    if !VehicleRepository::vacate_if_holds_tx(conn, position_id, tire_id)? {
        return Err(Precondition::TireNotInSourcePosition {
            tire_id: tire_id.to_string(),
            position_id: position_id.to_string(),
        }
        .into());
    }
    Ok(())
}

/// CAS 占位
fn occupy(conn: &Connection, position_id: &str, tire_id: &str) -> EngineResult<()> {
    if !VehicleRepository::occupy_if_empty_tx(conn, position_id, tire_id)? {
        return Err(Precondition::PositionOccupied {
            position_id: position_id.to_string(),
        }
        .into());
    }
    Ok(())
}

// ==========================================
// 新增
// ==========================================

fn create_tx(
    conn: &Connection,
    request: &AssignmentRequest,
    op: &ClassifiedOperation,
    policy: &AssignmentPolicy,
) -> EngineResult<TireAssignment> {
    let order = WorkOrderGate::require_opened(conn, &request.work_order_id)?;
    let tire = load_tire(conn, &request.tire_id)?;
    require_not_scrapped(&tire)?;
    check_inspection(conn, request.inspection_id.as_deref(), &tire.tire_id)?;

    let from = op.from_position_id().map(|id| load_position(conn, id)).transpose()?;
    let to = op.to_position_id().map(|id| load_position(conn, id)).transpose()?;

    match op {
        ClassifiedOperation::NewMount { .. } => {
            if let Some(current) = tire.current_position_id.as_deref() {
                return Err(Precondition::TireAlreadyMounted {
                    tire_id: tire.tire_id.clone(),
                    position_id: current.to_string(),
                }
                .into());
            }
        }
        ClassifiedOperation::Move { .. } | ClassifiedOperation::Discard { .. } => {
            if let Some(from) = from.as_ref() {
                require_holds(from, &tire.tire_id)?;
            }
        }
    }
    if let Some(to) = to.as_ref() {
        require_empty(to)?;
    }
    let reason = request.removal_reason().unwrap_or_default().to_string();
    if op.kind() == OperationKind::Discard && reason.is_empty() {
        return Err(Precondition::MissingRemovalReason.into());
    }
    authorize(conn, &order, from.as_ref(), to.as_ref(), policy)?;

    // ===== 校验完成，开始写入 =====

    let current_status = load_status(conn, &tire.status_id)?;
    let (next_status_id, scrapped) = match op.kind() {
        OperationKind::Discard => {
            let discarded = TireRepository::get_or_create_status_tx(conn, &policy.labels.discarded, "已报废")?;
            (discarded.status_id, true)
        }
        _ if current_status.status_name == policy.labels.ready => {
            let mounted = TireRepository::get_or_create_status_tx(conn, &policy.labels.mounted, "已装车")?;
            (mounted.status_id, false)
        }
        _ => (current_status.status_id.clone(), false),
    };

    if let Some(from_id) = op.from_position_id() {
        vacate(conn, from_id, &tire.tire_id)?;
    }
    if let Some(to_id) = op.to_position_id() {
        occupy(conn, to_id, &tire.tire_id)?;
    }

    let assignment_date = request
        .assignment_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let is_discard = op.kind() == OperationKind::Discard;
    let assignment = TireAssignment {
        assignment_id: uuid::Uuid::new_v4().to_string(),
        tire_id: tire.tire_id.clone(),
        from_position_id: op.from_position_id().map(str::to_string),
        to_position_id: op.to_position_id().map(str::to_string),
        is_discard,
        work_order_id: order.work_order_id.clone(),
        inspection_id: request.inspection_id.clone(),
        assignment_date,
        start_odometer: request.start_odometer.unwrap_or(order.current_odometer),
        end_odometer: request.end_odometer,
        removal_date: request
            .removal_date
            .or(if is_discard { Some(assignment_date) } else { None }),
        reason_for_removal: reason,
        notes: request.notes.clone().unwrap_or_default(),
        status_before_id: Some(tire.status_id.clone()),
        created_at: chrono::Local::now().naive_local(),
    };
    AssignmentRepository::insert_tx(conn, &assignment)?;

    TireRepository::update_placement_tx(
        conn,
        &tire.tire_id,
        tire.revision,
        &TirePlacementUpdate {
            current_position_id: op.to_position_id(),
            status_id: &next_status_id,
            is_scrapped: scrapped,
            last_assignment_id: Some(&assignment.assignment_id),
        },
    )?;

    // 报废不迁移巡检：历史停留在最后一个真实轮位
    if let Some(to_id) = op.to_position_id() {
        if let Some(from_id) = op.from_position_id() {
            let moved = InspectionRepository::repoint_for_tire_tx(
                conn,
                &tire.tire_id,
                from_id,
                to_id,
                Some(&order.work_order_id),
            )?;
            debug!(tire_id = %tire.tire_id, moved, "巡检已随轮胎迁移");
        }
        if let Some(inspection_id) = request.inspection_id.as_deref() {
            InspectionRepository::repoint_one_tx(conn, inspection_id, to_id, &order.work_order_id)?;
        }
    }

    let (action_type, vehicle_id) = match op.kind() {
        OperationKind::NewMount => (ActionType::TireMount, to.as_ref().map(|p| p.vehicle_id.as_str())),
        OperationKind::Move => (ActionType::TireMove, to.as_ref().map(|p| p.vehicle_id.as_str())),
        OperationKind::Discard => (ActionType::TireDiscard, from.as_ref().map(|p| p.vehicle_id.as_str())),
    };
    let mut log = ActionLog::new(action_type, &request.actor)
        .with_tire(&tire.tire_id)
        .with_payload(json!({
            "assignment_id": assignment.assignment_id,
            "from_position_id": assignment.from_position_id,
            "to_position_id": assignment.to_position_id,
            "work_order_id": assignment.work_order_id,
            "status_before_id": assignment.status_before_id,
            "status_after_id": next_status_id,
        }));
    if let Some(vehicle_id) = vehicle_id {
        log = log.with_vehicle(vehicle_id);
    }
    if is_discard {
        log = log.with_detail(assignment.reason_for_removal.clone());
    }
    ActionLogRepository::insert_tx(conn, &log)?;

    Ok(assignment)
}

// ==========================================
// 修改
// ==========================================

fn update_tx(
    conn: &Connection,
    assignment_id: &str,
    request: &AssignmentRequest,
    policy: &AssignmentPolicy,
) -> EngineResult<TireAssignment> {
    let existing = AssignmentRepository::find_tx(conn, assignment_id)?
        .ok_or_else(|| EngineError::not_found("TireAssignment", assignment_id))?;

    // 报废为终态；也不允许把非报废记录改成报废
    if existing.is_discard() {
        return Err(EngineError::transition(OperationKind::Discard.to_string(), "UPDATED"));
    }
    if requests_discard(request) {
        return Err(EngineError::transition(existing.kind().to_string(), OperationKind::Discard.to_string()));
    }

    let op = classify_request(request)?;
    if request.tire_id != existing.tire_id {
        return Err(EngineError::transition(
            format!("tire={}", existing.tire_id),
            format!("tire={}", request.tire_id),
        ));
    }
    if op.from_position_id() != existing.from_position_id.as_deref() {
        return Err(EngineError::transition(
            format!("{}(from={:?})", existing.kind(), existing.from_position_id),
            format!("{}(from={:?})", op.kind(), op.from_position_id()),
        ));
    }

    let tire = load_tire(conn, &existing.tire_id)?;
    require_not_scrapped(&tire)?;
    if tire.last_assignment_id.as_deref() != Some(existing.assignment_id.as_str()) {
        return Err(EngineError::transition("SUPERSEDED", "UPDATED"));
    }
    let order = WorkOrderGate::require_opened(conn, &request.work_order_id)?;
    check_inspection(conn, request.inspection_id.as_deref(), &tire.tire_id)?;

    let old_to_id = existing
        .to_position_id
        .clone()
        .ok_or(Precondition::MissingDestination)?;
    let new_to_id = op
        .to_position_id()
        .ok_or(Precondition::MissingDestination)?
        .to_string();
    let target_changed = new_to_id != old_to_id;
    let order_changed = order.work_order_id != existing.work_order_id;

    if target_changed || order_changed {
        let from = existing
            .from_position_id
            .as_deref()
            .map(|id| load_position(conn, id))
            .transpose()?;
        let new_to = load_position(conn, &new_to_id)?;
        if target_changed {
            require_holds(&load_position(conn, &old_to_id)?, &tire.tire_id)?;
            require_empty(&new_to)?;
        }
        authorize(conn, &order, from.as_ref(), Some(&new_to), policy)?;
    }

    // ===== 校验完成，开始写入 =====

    if target_changed {
        vacate(conn, &old_to_id, &tire.tire_id)?;
        occupy(conn, &new_to_id, &tire.tire_id)?;
        TireRepository::update_placement_tx(
            conn,
            &tire.tire_id,
            tire.revision,
            &TirePlacementUpdate {
                current_position_id: Some(&new_to_id),
                status_id: &tire.status_id,
                is_scrapped: false,
                last_assignment_id: Some(&existing.assignment_id),
            },
        )?;
        InspectionRepository::repoint_for_tire_tx(
            conn,
            &tire.tire_id,
            &old_to_id,
            &new_to_id,
            Some(&order.work_order_id),
        )?;
    }
    // 目标、工单、关联巡检均未变时不改写巡检
    let inspection_changed = request.inspection_id != existing.inspection_id;
    if target_changed || order_changed || inspection_changed {
        if let Some(inspection_id) = request.inspection_id.as_deref() {
            InspectionRepository::repoint_one_tx(conn, inspection_id, &new_to_id, &order.work_order_id)?;
        }
    }

    let updated = TireAssignment {
        to_position_id: Some(new_to_id.clone()),
        work_order_id: order.work_order_id.clone(),
        inspection_id: request.inspection_id.clone(),
        assignment_date: request.assignment_date.unwrap_or(existing.assignment_date),
        start_odometer: request.start_odometer.unwrap_or(existing.start_odometer),
        end_odometer: request.end_odometer,
        removal_date: request.removal_date,
        reason_for_removal: request.removal_reason().unwrap_or_default().to_string(),
        notes: request.notes.clone().unwrap_or_default(),
        ..existing.clone()
    };
    AssignmentRepository::update_tx(conn, &updated)?;

    let log = ActionLog::new(ActionType::AssignmentUpdate, &request.actor)
        .with_tire(&tire.tire_id)
        .with_payload(json!({
            "assignment_id": updated.assignment_id,
            "to_position_before": old_to_id,
            "to_position_after": new_to_id,
            "work_order_before": existing.work_order_id,
            "work_order_after": updated.work_order_id,
        }));
    ActionLogRepository::insert_tx(conn, &log)?;

    Ok(updated)
}

// ==========================================
// 删除回滚
// ==========================================

fn delete_tx(conn: &Connection, assignment_id: &str, actor: &str) -> EngineResult<()> {
    let existing = AssignmentRepository::find_tx(conn, assignment_id)?
        .ok_or_else(|| EngineError::not_found("TireAssignment", assignment_id))?;
    if existing.is_discard() {
        return Err(EngineError::transition(OperationKind::Discard.to_string(), "DELETED"));
    }

    let tire = load_tire(conn, &existing.tire_id)?;
    if tire.last_assignment_id.as_deref() != Some(existing.assignment_id.as_str()) {
        return Err(EngineError::transition("SUPERSEDED", "DELETED"));
    }
    let to_id = existing
        .to_position_id
        .as_deref()
        .ok_or(Precondition::MissingDestination)?;
    require_holds(&load_position(conn, to_id)?, &tire.tire_id)?;
    if let Some(from_id) = existing.from_position_id.as_deref() {
        if load_position(conn, from_id)?.is_occupied() {
            return Err(Precondition::RollbackSourceOccupied {
                position_id: from_id.to_string(),
            }
            .into());
        }
    }

    // ===== 校验完成，开始写入 =====

    vacate(conn, to_id, &tire.tire_id)?;
    if let Some(from_id) = existing.from_position_id.as_deref() {
        if !VehicleRepository::occupy_if_empty_tx(conn, from_id, &tire.tire_id)? {
            return Err(Precondition::RollbackSourceOccupied {
                position_id: from_id.to_string(),
            }
            .into());
        }
        InspectionRepository::repoint_for_tire_tx(conn, &tire.tire_id, to_id, from_id, None)?;
    }

    let previous = AssignmentRepository::find_latest_for_tire_tx(conn, &tire.tire_id, Some(assignment_id))?;
    let restored_status = existing
        .status_before_id
        .clone()
        .unwrap_or_else(|| tire.status_id.clone());
    TireRepository::update_placement_tx(
        conn,
        &tire.tire_id,
        tire.revision,
        &TirePlacementUpdate {
            current_position_id: existing.from_position_id.as_deref(),
            status_id: &restored_status,
            is_scrapped: false,
            last_assignment_id: previous.as_ref().map(|a| a.assignment_id.as_str()),
        },
    )?;
    AssignmentRepository::delete_tx(conn, assignment_id)?;

    let log = ActionLog::new(ActionType::AssignmentDelete, actor)
        .with_tire(&tire.tire_id)
        .with_payload(json!({
            "assignment_id": assignment_id,
            "restored_position_id": existing.from_position_id,
            "vacated_position_id": to_id,
            "restored_status_id": restored_status,
            "restored_last_assignment_id": previous.as_ref().map(|a| a.assignment_id.clone()),
        }));
    ActionLogRepository::insert_tx(conn, &log)?;

    Ok(())
}
