//! 컬렉션 (마켓플레이스 리스팅 소스) 정의.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult, MarketplaceKind};

/// 동기화 대상 마켓플레이스 컬렉션.
///
/// 관리자가 별도로 등록/수정하며 동기화 엔진에게는 읽기 전용입니다.
/// `kind`에 따라 의미 있는 외부 참조 필드가 달라집니다:
///
/// | kind | 조회 키 | permalink |
/// |---|---|---|
/// | `GameStop` | `external_id` | `address` |
/// | `Imx` | `address` | `address` |
/// | `OpenSea` | `slug` | `address` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// 컬렉션 ID
    pub id: Uuid,
    /// 표시 이름
    pub name: String,
    /// 마켓플레이스 종류 (생성 후 불변)
    pub kind: MarketplaceKind,
    /// 컨트랙트 주소
    #[serde(default)]
    pub address: Option<String>,
    /// OpenSea 컬렉션 slug
    #[serde(default)]
    pub slug: Option<String>,
    /// 외부 컬렉션 ID (GameStop)
    #[serde(default)]
    pub external_id: Option<String>,
    /// 소스별 메타데이터
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl Collection {
    /// 새 컬렉션 생성.
    pub fn new(name: impl Into<String>, kind: MarketplaceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            address: None,
            slug: None,
            external_id: None,
            meta: serde_json::Value::Null,
        }
    }

    /// 컨트랙트 주소 설정.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// slug 설정.
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// 외부 컬렉션 ID 설정.
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// 메타데이터 설정.
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }

    /// 컨트랙트 주소 (필수).
    pub fn require_address(&self) -> CoreResult<&str> {
        self.require(self.address.as_deref(), "address")
    }

    /// slug (필수).
    pub fn require_slug(&self) -> CoreResult<&str> {
        self.require(self.slug.as_deref(), "slug")
    }

    /// 외부 컬렉션 ID (필수).
    pub fn require_external_id(&self) -> CoreResult<&str> {
        self.require(self.external_id.as_deref(), "external_id")
    }

    /// 메타데이터에서 문자열 값 조회.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    fn require<'a>(&self, value: Option<&'a str>, field: &'static str) -> CoreResult<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CoreError::MissingReference {
                kind: self.kind,
                field,
            }),
        }
    }
}
