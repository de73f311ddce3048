// ==========================================
// 果酒压榨台账 - 分配引擎配置
// ==========================================
// 容差只吸收浮点/单位换算误差，调用方不应依赖超出容差
// ==========================================

use serde::{Deserialize, Serialize};

/// 分配引擎配置快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Σ 分配毛体积允许超出实测出汁量的容差（L）
    pub volume_tolerance_l: f64,
    /// 单容器净体积允许超出剩余容量的容差（L）
    pub capacity_tolerance_l: f64,
    /// 成分比例之和与 1.0 的允许偏差
    pub fraction_epsilon: f64,
    /// 采购批次耗尽判定容差（kg）
    pub depletion_epsilon_kg: f64,
    /// 酒批名称冲突后缀上限（_2 .. _N）
    pub batch_name_max_suffix: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            volume_tolerance_l: 0.02,
            capacity_tolerance_l: 0.001,
            fraction_epsilon: 1e-6,
            depletion_epsilon_kg: 0.001,
            batch_name_max_suffix: 99,
        }
    }
}
