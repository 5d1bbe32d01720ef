use serde::{Deserialize, Serialize};

/// 构建记录状态
///
/// 本服务只负责 pending → building / failed，后续状态由 CI 流水线维护。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Pending,
    Building,
    Failed,
}

impl BuildStatus {
    pub fn can_transition_to(&self, next: BuildStatus) -> bool {
        matches!(
            (self, next),
            (BuildStatus::Pending, BuildStatus::Building) | (BuildStatus::Pending, BuildStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Pending => "pending",
            BuildStatus::Building => "building",
            BuildStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BuildStatus::Pending),
            "building" => Some(BuildStatus::Building),
            "failed" => Some(BuildStatus::Failed),
            _ => None,
        }
    }
}
