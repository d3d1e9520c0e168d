//! DataSource Configuration
//!
//! 대상별 데이터소스 설정 (주소, 인증 정보, 풀 크기)

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{DataSourceError, DataSourceResult};
use super::routing::ConnectionTarget;

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 데이터베이스 서버 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// 스킴 (`postgres`, `mysql` 등)
    pub scheme: String,
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// 데이터베이스 이름
    pub database: Option<String>,
}

impl ServerAddress {
    /// 새 서버 주소 생성
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
            database: None,
        }
    }

    /// 데이터베이스 이름 설정
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// URL에서 파싱
    ///
    /// 형식: `[jdbc:]scheme://host[:port][/database][?options]`
    ///
    /// URL에 인증 정보(`user:password@`)를 넣을 수 없습니다. `username` /
    /// `password` 속성을 사용하세요. 에러 메시지의 URL은 인증 부분이 가려집니다.
    pub fn from_url(url: &str) -> DataSourceResult<Self> {
        let url = url.trim();
        let stripped = url.strip_prefix("jdbc:").unwrap_or(url);

        let (scheme, rest) = stripped.split_once("://").ok_or_else(|| {
            DataSourceError::configuration(format!("Invalid datasource url: {}", redact_url(url)))
        })?;
        if scheme.is_empty() {
            return Err(DataSourceError::configuration(format!(
                "Missing scheme in url: {}",
                redact_url(url)
            )));
        }

        // 쿼리 옵션은 무시
        let rest = rest.split('?').next().unwrap_or_default();
        let (authority, database) = match rest.split_once('/') {
            Some((authority, db)) if !db.is_empty() => (authority, Some(db.to_string())),
            Some((authority, _)) => (authority, None),
            None => (rest, None),
        };

        if authority.contains('@') {
            return Err(DataSourceError::configuration(format!(
                "Credentials must not be embedded in url: {}",
                redact_url(url)
            )));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    DataSourceError::configuration(format!("Invalid port in url: {}", redact_url(url)))
                })?;
                (host, port)
            }
            None => {
                let port = default_port(scheme).ok_or_else(|| {
                    DataSourceError::configuration(format!("No port given and no default for scheme '{}'", scheme))
                })?;
                (authority, port)
            }
        };

        if host.is_empty() {
            return Err(DataSourceError::configuration(format!(
                "Missing host in url: {}",
                redact_url(url)
            )));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            database,
        })
    }

    /// 소켓 주소로 변환
    pub fn to_socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// URL의 인증 부분(`user:password@`)을 `***@`로 가림
fn redact_url(url: &str) -> String {
    let Some((head, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find(|c| c == '/' || c == '?').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***{}", head, &rest[at..]),
        None => url.to_string(),
    }
}

/// 스킴별 기본 포트
fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "postgres" | "postgresql" => Some(5432),
        "mysql" | "mariadb" => Some(3306),
        "sqlserver" => Some(1433),
        _ => None,
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)?;
        if let Some(db) = &self.database {
            write!(f, "/{}", db)?;
        }
        Ok(())
    }
}

// ============================================================================
// Credentials - 인증 정보
// ============================================================================

/// 인증 정보
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// 인증 없음
    #[default]
    None,
    /// 사용자명/비밀번호
    Basic {
        /// 사용자명
        username: String,
        /// 비밀번호
        password: String,
    },
}

impl Credentials {
    /// Basic 인증 정보 생성
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// 사용자명
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Basic { username, .. } => Some(username),
        }
    }
}

// 비밀번호는 출력하지 않음
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// ============================================================================
// DataSourceProperties - 대상별 설정
// ============================================================================

/// 데이터소스 하나의 설정
///
/// | 필드 | 기본값 | 설명 |
/// |------|--------|------|
/// | `url` | (필수) | 접속 URL |
/// | `username` | 없음 | 사용자명 |
/// | `password` | 없음 | 비밀번호 |
/// | `max_pool_size` | 10 | 최대 연결 수 |
/// | `connection_timeout_ms` | 30000 | 연결 타임아웃 (ms) |
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSourceProperties {
    /// 접속 URL
    pub url: String,
    /// 사용자명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// 비밀번호
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// 최대 연결 수
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,
    /// 연결 타임아웃 (ms)
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

fn default_max_pool_size() -> usize {
    10
}

fn default_connection_timeout_ms() -> u64 {
    30_000
}

impl DataSourceProperties {
    /// URL로 새 설정 생성
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            max_pool_size: default_max_pool_size(),
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }

    /// 빌더 시작
    pub fn builder(url: impl Into<String>) -> DataSourcePropertiesBuilder {
        DataSourcePropertiesBuilder {
            properties: Self::new(url),
        }
    }

    /// 연결 타임아웃
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// 인증 정보
    pub fn credentials(&self) -> Credentials {
        match &self.username {
            Some(username) => Credentials::basic(username.clone(), self.password.clone().unwrap_or_default()),
            None => Credentials::None,
        }
    }

    /// 서버 주소 파싱
    pub fn address(&self) -> DataSourceResult<ServerAddress> {
        ServerAddress::from_url(&self.url)
    }

    /// 유효성 검사
    pub fn validate(&self) -> DataSourceResult<()> {
        self.address()?;
        if self.max_pool_size == 0 {
            return Err(DataSourceError::configuration("max_pool_size must be at least 1"));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(DataSourceError::configuration("password given without username"));
        }
        Ok(())
    }

    /// 필드 하나를 문자열 값으로 설정 (`max-pool-size`, `max_pool_size` 등 허용)
    fn set_field(&mut self, field: &str, value: &str) -> DataSourceResult<()> {
        let field = field.replace('-', "_").to_ascii_lowercase();
        match field.as_str() {
            "url" | "jdbc_url" => self.url = value.to_string(),
            "username" => self.username = Some(value.to_string()),
            "password" => self.password = Some(value.to_string()),
            "max_pool_size" | "maximum_pool_size" => {
                self.max_pool_size = value.parse().map_err(|_| {
                    DataSourceError::configuration(format!("Invalid pool size '{}'", value))
                })?;
            }
            "connection_timeout" | "connection_timeout_ms" => {
                self.connection_timeout_ms = value.parse().map_err(|_| {
                    DataSourceError::configuration(format!("Invalid connection timeout '{}'", value))
                })?;
            }
            other => {
                return Err(DataSourceError::configuration(format!(
                    "Unknown datasource property '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DataSourceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceProperties")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("max_pool_size", &self.max_pool_size)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .finish()
    }
}

/// 데이터소스 설정 빌더
pub struct DataSourcePropertiesBuilder {
    properties: DataSourceProperties,
}

impl DataSourcePropertiesBuilder {
    /// 인증 정보 설정
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.properties.username = Some(username.into());
        self.properties.password = Some(password.into());
        self
    }

    /// 최대 연결 수 설정
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.properties.max_pool_size = size;
        self
    }

    /// 연결 타임아웃 설정
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.properties.connection_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 빌드
    pub fn build(self) -> DataSourceProperties {
        self.properties
    }
}

// ============================================================================
// DataSourcesConfig - 전체 설정
// ============================================================================

/// 프로퍼티 키 접두사
const PROPERTY_PREFIX: &str = "datasource.";

/// 대상별 데이터소스 설정 모음
///
/// 역직렬화와 [`from_properties`](Self::from_properties)는 같은 대상을 두 번
/// 정의하면 (`MASTER`와 `primary` 등 별칭 포함) 실패합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataSourcesConfig {
    sources: BTreeMap<ConnectionTarget, DataSourceProperties>,
}

impl DataSourcesConfig {
    /// 빈 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 대상 설정 추가 (코드에서 조립할 때 사용, 같은 대상은 덮어씀)
    pub fn with_source(mut self, target: ConnectionTarget, properties: DataSourceProperties) -> Self {
        self.sources.insert(target, properties);
        self
    }

    /// 대상 설정 조회
    pub fn get(&self, target: ConnectionTarget) -> Option<&DataSourceProperties> {
        self.sources.get(&target)
    }

    /// 설정된 대상 순회
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionTarget, &DataSourceProperties)> {
        self.sources.iter().map(|(t, p)| (*t, p))
    }

    /// 설정이 없는 대상 목록
    pub fn missing_targets(&self) -> Vec<ConnectionTarget> {
        ConnectionTarget::ALL
            .into_iter()
            .filter(|t| !self.sources.contains_key(t))
            .collect()
    }

    /// 모든 대상이 설정되었고 각 설정이 유효한지 확인
    pub fn validate(&self) -> DataSourceResult<()> {
        let missing = self.missing_targets();
        if !missing.is_empty() {
            return Err(DataSourceError::configuration(format!(
                "No datasource configured for {}",
                join_targets(&missing)
            )));
        }
        for (target, properties) in self.iter() {
            properties.validate().map_err(|e| match e {
                DataSourceError::Configuration(msg) => {
                    DataSourceError::configuration(format!("{}: {}", target, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// `datasource.<target>.<field>` 형식의 키/값 쌍에서 생성
    ///
    /// `spring.` 접두사는 선택이며, `datasource.` 외의 키는 무시합니다.
    pub fn from_properties<I, K, V>(pairs: I) -> DataSourceResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut sections: BTreeMap<ConnectionTarget, Vec<(String, String)>> = BTreeMap::new();
        // 대상별로 처음 사용된 이름 (별칭 중복 검출)
        let mut claimed: BTreeMap<ConnectionTarget, String> = BTreeMap::new();

        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let key = key.strip_prefix("spring.").unwrap_or(key);
            let Some(rest) = key.strip_prefix(PROPERTY_PREFIX) else {
                tracing::trace!(key, "ignoring non-datasource property");
                continue;
            };

            let (name, field) = rest.split_once('.').ok_or_else(|| {
                DataSourceError::configuration(format!("Malformed datasource property '{}'", key))
            })?;
            let target: ConnectionTarget = name
                .parse()
                .map_err(|e: DataSourceError| DataSourceError::configuration(e.to_string()))?;

            let alias = name.trim().to_ascii_lowercase();
            match claimed.get(&target) {
                Some(first) if *first != alias => {
                    return Err(DataSourceError::configuration(format!(
                        "Duplicate datasource definition for {} ('{}' and '{}')",
                        target, first, alias
                    )));
                }
                Some(_) => {}
                None => {
                    claimed.insert(target, alias);
                }
            }

            sections
                .entry(target)
                .or_default()
                .push((field.to_string(), value.as_ref().trim().to_string()));
        }

        let mut config = Self::new();
        for (target, fields) in sections {
            let mut properties = DataSourceProperties::new(String::new());
            for (field, value) in &fields {
                properties.set_field(field, value)?;
            }
            if properties.url.is_empty() {
                return Err(DataSourceError::configuration(format!(
                    "Missing url for datasource {}",
                    target
                )));
            }
            config.sources.insert(target, properties);
        }

        Ok(config)
    }

    /// `key=value` 줄 단위 텍스트에서 생성 (`#`, `!` 주석 허용)
    pub fn from_properties_str(text: &str) -> DataSourceResult<Self> {
        let mut pairs = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                DataSourceError::configuration(format!("Line {}: expected key=value", lineno + 1))
            })?;
            pairs.push((key.trim().to_string(), value.trim().to_string()));
        }
        Self::from_properties(pairs)
    }
}

impl<'de> Deserialize<'de> for DataSourcesConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SourcesVisitor;

        impl<'de> Visitor<'de> for SourcesVisitor {
            type Value = DataSourcesConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of datasource target to properties")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut sources = BTreeMap::new();
                while let Some((target, properties)) =
                    map.next_entry::<ConnectionTarget, DataSourceProperties>()?
                {
                    if sources.insert(target, properties).is_some() {
                        return Err(de::Error::custom(format!(
                            "Duplicate datasource definition for {}",
                            target
                        )));
                    }
                }
                Ok(DataSourcesConfig { sources })
            }
        }

        deserializer.deserialize_map(SourcesVisitor)
    }
}

/// 대상 목록을 `MASTER, SLAVE` 형식으로 연결
pub(crate) fn join_targets(targets: &[ConnectionTarget]) -> String {
    targets
        .iter()
        .map(ConnectionTarget::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Tests
// ============================================================================
