//! 错误分类 (按错误码千位)

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// | 范围 | 分类 |
/// |------|------|
/// | 0xxx | General |
/// | 1xxx | Auth |
/// | 4xxx | Order |
/// | 6xxx | Menu |
/// | 7xxx | Table |
/// | 其它 | System |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Order,
    Menu,
    Table,
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            4 => Self::Order,
            6 => Self::Menu,
            7 => Self::Table,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
