//! # MRP Calculation Engine
//!
//! 需求彙總、缺料分類與訂單可生產性計算

pub mod buildability;
pub mod calculator;
pub mod netting;
pub mod pegging;
pub mod requirements;
pub mod shortage;

// Re-export 主要類型
pub use buildability::{BuildStatus, BuildabilityCalculator, MaterialBuildLine, OrderBuildability};
pub use calculator::MrpCalculator;
pub use netting::NettingCalculator;
pub use pegging::PeggingCalculator;
pub use requirements::{
    OrderDemand, OrderDemandLine, RequirementLine, RequirementsCalculator, RequirementsReport,
};
pub use shortage::{
    AssemblyShortage, CustomerShortage, MaterialShortage, OrderMaterialShortage, OrderShortage,
    ResourceTypeShortage, ShortageCalculator, UNTAGGED_RESOURCE_TYPE,
};

use serde::Serialize;

/// 報表診斷資訊：不合法的資料列被略過並計數，不會使整份報表失敗
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportDiagnostics {
    /// 掃描的訂單數
    pub orders_scanned: usize,

    /// 計入需求的訂單數
    pub orders_included: usize,

    /// 因資料不合法而略過的訂單數
    pub orders_skipped: usize,

    /// 用量不合法而略過的 BOM 行數（每個 BOM 版本只計一次）
    pub bom_items_skipped: usize,

    /// 庫存來源查無而略過的物料數
    pub materials_skipped: usize,

    /// 警告信息
    pub warnings: Vec<MrpWarning>,
}

impl ReportDiagnostics {
    /// 添加警告
    pub fn add_warning(&mut self, warning: MrpWarning) {
        match warning.severity {
            WarningSeverity::Info => tracing::info!("{}: {}", warning.subject, warning.message),
            WarningSeverity::Warning => tracing::warn!("{}: {}", warning.subject, warning.message),
        }
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.orders_skipped == 0 && self.bom_items_skipped == 0 && self.materials_skipped == 0
    }
}

/// MRP 警告
#[derive(Debug, Clone, Serialize)]
pub struct MrpWarning {
    /// 相關訂單或物料
    pub subject: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl MrpWarning {
    pub fn new(subject: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            subject,
            message,
            severity,
        }
    }

    pub fn info(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Info)
    }

    pub fn warning(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningSeverity {
    /// 不影響數字的提示，例如訂單已無剩餘需求
    Info,
    Warning,
}
