// ==========================================
// 车队轮胎管理系统 - 轮位/轮胎一致性巡查
// ==========================================
// 职责: 找出违反双向引用约束的轮胎/轮位（只读）
// ==========================================

use crate::engine::error::EngineResult;
use crate::repository::{TireRepository, VehicleRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 一处不一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inconsistency {
    /// 轮胎指向轮位，但轮位未装该轮胎
    TireNotHeldByPosition { tire_id: String, position_id: String },
    /// 轮位装着轮胎，但轮胎未指向该轮位
    PositionHoldsDetachedTire { position_id: String, tire_id: String },
    /// 已报废轮胎仍在车上
    ScrappedTireMounted { tire_id: String, position_id: String },
}

pub struct RegistryAudit {
    tire_repo: TireRepository,
    vehicle_repo: VehicleRepository,
}

impl RegistryAudit {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            tire_repo: TireRepository::new(conn.clone()),
            vehicle_repo: VehicleRepository::new(conn),
        }
    }

    pub fn find_inconsistencies(&self) -> EngineResult<Vec<Inconsistency>> {
        let tires = self.tire_repo.list_all()?;
        let positions = self.vehicle_repo.list_all_positions()?;

        let holder_of: HashMap<&str, &str> = positions
            .iter()
            .filter_map(|p| p.mounted_tire_id.as_deref().map(|t| (p.position_id.as_str(), t)))
            .collect();
        let placement_of: HashMap<&str, Option<&str>> = tires
            .iter()
            .map(|t| (t.tire_id.as_str(), t.current_position_id.as_deref()))
            .collect();

        let mut found = Vec::new();
        for tire in &tires {
            if let Some(position_id) = tire.current_position_id.as_deref() {
                if holder_of.get(position_id) != Some(&tire.tire_id.as_str()) {
                    found.push(Inconsistency::TireNotHeldByPosition {
                        tire_id: tire.tire_id.clone(),
                        position_id: position_id.to_string(),
                    });
                }
                if tire.is_scrapped {
                    found.push(Inconsistency::ScrappedTireMounted {
                        tire_id: tire.tire_id.clone(),
                        position_id: position_id.to_string(),
                    });
                }
            }
        }
        for (position_id, tire_id) in &holder_of {
            if placement_of.get(tire_id).copied().flatten() != Some(*position_id) {
                found.push(Inconsistency::PositionHoldsDetachedTire {
                    position_id: position_id.to_string(),
                    tire_id: tire_id.to_string(),
                });
            }
        }

        if !found.is_empty() {
            tracing::warn!(count = found.len(), "发现轮位/轮胎不一致");
        }
        Ok(found)
    }
}
