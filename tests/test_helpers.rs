// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================
#![allow(dead_code)]

use chrono::NaiveDate;
use press_ledger::app::AppState;
use press_ledger::db::{init_schema, open_sqlite_connection};
use press_ledger::domain::batch::CompositionEntry;
use press_ledger::domain::press_run::PressRun;
use press_ledger::domain::purchase::PurchaseLot;
use press_ledger::domain::types::VesselStatus;
use press_ledger::domain::vessel::Vessel;
use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;

pub const ACTOR: &str = "cellar-master";
pub const EPS: f64 = 1e-6;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试环境：临时库 + 完整装配的 AppState
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub state: AppState,
}

impl TestEnv {
    /// 对同一文件再打开一个独立的 AppState（模拟另一个进程/连接）
    pub fn second_state(&self) -> AppState {
        AppState::new(self.db_path.clone()).unwrap()
    }

    /// 独立连接（用于断言，不经过 API）
    pub fn raw_conn(&self) -> Connection {
        open_sqlite_connection(&self.db_path).unwrap()
    }

    pub fn count(&self, table: &str) -> i64 {
        self.raw_conn()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    pub fn lot(&self, lot_id: &str) -> PurchaseLot {
        self.state
            .purchase_lot_repo
            .find_by_id(lot_id)
            .unwrap()
            .unwrap()
    }

    pub fn vessel(&self, vessel_id: &str) -> Vessel {
        self.state.vessel_repo.find_by_id(vessel_id).unwrap().unwrap()
    }

    /// 登记采购批次
    pub fn seed_lot(&self, lot: LotBuilder) {
        let repo = &self.state.purchase_lot_repo;
        repo.upsert_variety(&lot.variety_id, &lot.variety_name).unwrap();
        repo.insert(&lot.build()).unwrap();
    }

    /// 登记容器（容器编号与ID相同）
    pub fn seed_vessel(&self, vessel_id: &str, capacity_l: f64, status: VesselStatus) {
        let now = chrono::Local::now().naive_local();
        self.state
            .vessel_repo
            .insert(&Vessel {
                vessel_id: vessel_id.to_string(),
                code: vessel_id.to_string(),
                capacity_l,
                status,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    /// 新建压榨批次并依次上料
    pub fn press(&self, date: NaiveDate, loads: &[(&str, f64)]) -> PressRun {
        let api = &self.state.press_run_api;
        let run = api.create_press_run(date, None, ACTOR).unwrap();
        for (lot_id, weight) in loads {
            api.add_load(&run.press_run_id, lot_id, *weight, ACTOR).unwrap();
        }
        api.get_press_run(&run.press_run_id).unwrap()
    }
}

/// 创建测试环境
pub fn setup_env() -> TestEnv {
    press_ledger::logging::init_test();
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path.clone()).unwrap();
    TestEnv {
        _temp_file: temp_file,
        db_path,
        state,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 断言酒批成分不变量：Σ比例 = 1，Σ体积 = 酒批体积
pub fn assert_invariants(entries: &[CompositionEntry], volume_l: f64) {
    let fraction_sum: f64 = entries.iter().map(|e| e.fraction_of_batch).sum();
    let volume_sum: f64 = entries.iter().map(|e| e.juice_volume_l).sum();
    assert!(
        (fraction_sum - 1.0).abs() < EPS,
        "fraction sum {} != 1.0",
        fraction_sum
    );
    assert!(
        (volume_sum - volume_l).abs() < EPS,
        "volume sum {} != batch volume {}",
        volume_sum,
        volume_l
    );
}

pub fn entry<'a>(entries: &'a [CompositionEntry], lot_id: &str) -> &'a CompositionEntry {
    entries
        .iter()
        .find(|e| e.lot_id == lot_id)
        .unwrap_or_else(|| panic!("composition has no entry for {}", lot_id))
}

// ==========================================
// 采购批次构建器
// ==========================================

pub struct LotBuilder {
    lot_id: String,
    variety_id: String,
    variety_name: String,
    weight_kg: f64,
    cost: f64,
}

impl LotBuilder {
    /// 默认品种 Kingston Black，单价 0.5/kg
    pub fn new(lot_id: &str, weight_kg: f64) -> Self {
        Self {
            lot_id: lot_id.to_string(),
            variety_id: "kingston".to_string(),
            variety_name: "Kingston Black".to_string(),
            weight_kg,
            cost: weight_kg * 0.5,
        }
    }

    pub fn variety(mut self, variety_id: &str, name: &str) -> Self {
        self.variety_id = variety_id.to_string();
        self.variety_name = name.to_string();
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn build(&self) -> PurchaseLot {
        let now = chrono::Local::now().naive_local();
        PurchaseLot {
            lot_id: self.lot_id.clone(),
            variety_id: self.variety_id.clone(),
            variety_name: Some(self.variety_name.clone()),
            vendor_id: "orchard-1".to_string(),
            total_input_weight_kg: self.weight_kg,
            total_cost: self.cost,
            allocated_weight_kg: 0.0,
            depleted: false,
            depleted_at: None,
            depleted_by: None,
            depleted_by_press_run_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
