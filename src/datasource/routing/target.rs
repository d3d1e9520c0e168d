//! 연결 대상
//!
//! 라우팅 가능한 데이터소스 역할의 닫힌 집합입니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::super::error::{DataSourceError, DataSourceResult};

/// 대상 수
pub(crate) const TARGET_COUNT: usize = ConnectionTarget::ALL.len();

/// 연결 대상 (데이터소스 역할)
///
/// 새 대상을 추가하면 `ALL`, `as_str`, `role` 등 모든 `match`가 컴파일 시점에
/// 갱신을 요구합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ConnectionTarget {
    /// 주 데이터베이스 (기본값)
    #[default]
    #[serde(rename = "MASTER", alias = "primary", alias = "master")]
    Primary,
    /// 복제본 1
    #[serde(rename = "SLAVE", alias = "replica1", alias = "slave")]
    Replica1,
    /// 복제본 2
    #[serde(rename = "SLAVE_2", alias = "replica2", alias = "slave_2")]
    Replica2,
}

impl ConnectionTarget {
    /// 모든 대상
    pub const ALL: [ConnectionTarget; 3] = [Self::Primary, Self::Replica1, Self::Replica2];

    /// 기본 대상
    pub const DEFAULT: ConnectionTarget = Self::Primary;

    /// 설정 이름 (`MASTER`, `SLAVE`, `SLAVE_2`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "MASTER",
            Self::Replica1 => "SLAVE",
            Self::Replica2 => "SLAVE_2",
        }
    }

    /// 역할 이름 (`primary`, `replica1`, `replica2`)
    pub fn role(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Replica1 => "replica1",
            Self::Replica2 => "replica2",
        }
    }

    /// 기본 대상 여부
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// 복제본 여부
    pub fn is_replica(&self) -> bool {
        match self {
            Self::Primary => false,
            Self::Replica1 | Self::Replica2 => true,
        }
    }

    /// `ALL` 내 위치
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Replica1 => 1,
            Self::Replica2 => 2,
        }
    }
}

impl FromStr for ConnectionTarget {
    type Err = DataSourceError;

    /// 설정 이름 또는 역할 이름에서 파싱 (대소문자 무시)
    fn from_str(s: &str) -> DataSourceResult<Self> {
        let normalized = squash(s);
        Self::ALL
            .into_iter()
            .find(|t| squash(t.as_str()) == normalized || squash(t.role()) == normalized)
            .ok_or_else(|| DataSourceError::unknown_target(s.trim()))
    }
}

/// 구분자 제거 + 대문자화 (`slave-2`, `SLAVE_2`, `slave2` 동일 취급)
fn squash(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
