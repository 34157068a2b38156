//! 정규화된 에셋 레코드.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 어댑터가 생성한, 아직 저장되지 않은 정규화 에셋.
///
/// 모든 마켓플레이스 레코드는 이 형태로 변환된 뒤 스냅샷에 저장됩니다.
/// `created_at`/`updated_at`은 항상 유효한 시각입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    /// 소스 아이템 ID (토큰 ID)
    pub iid: String,
    /// 소속 컬렉션 ID
    pub collection_id: Uuid,
    /// 표시 이름
    pub name: String,
    /// 설명
    pub description: String,
    /// 대표 이미지 URL (없으면 빈 문자열)
    pub image: String,
    /// 컨트랙트/컬렉션 주소
    pub address: String,
    /// 소유자 주소 (알 수 없으면 빈 문자열)
    pub owner: String,
    /// 마켓플레이스별 메타데이터
    pub meta: serde_json::Value,
    /// 마켓플레이스 아이템 페이지 URL
    pub url: String,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 마지막 갱신 시각
    pub updated_at: DateTime<Utc>,
}

/// 스냅샷 테이블에 저장된 에셋 행.
///
/// `id`는 동기화마다 새로 발급되므로 논리적 동일성은 [`Asset::content`]로 비교합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Asset {
    pub id: Uuid,
    pub iid: String,
    pub collection_id: Uuid,
    pub name: String,
    pub description: String,
    pub image: String,
    pub address: String,
    pub owner: String,
    pub meta: serde_json::Value,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// 새 행 ID로 저장 레코드 생성.
    pub fn from_new(asset: NewAsset) -> Self {
        Self {
            id: Uuid::new_v4(),
            iid: asset.iid,
            collection_id: asset.collection_id,
            name: asset.name,
            description: asset.description,
            image: asset.image,
            address: asset.address,
            owner: asset.owner,
            meta: asset.meta,
            url: asset.url,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }

    /// 행 ID를 제외한 논리적 내용.
    pub fn content(&self) -> NewAsset {
        NewAsset {
            iid: self.iid.clone(),
            collection_id: self.collection_id,
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            address: self.address.clone(),
            owner: self.owner.clone(),
            meta: self.meta.clone(),
            url: self.url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_ignores_row_id() {
        let new = NewAsset {
            iid: "42".to_string(),
            collection_id: Uuid::new_v4(),
            name: "Kira #42".to_string(),
            description: String::new(),
            image: String::new(),
            address: "0xabc".to_string(),
            owner: String::new(),
            meta: serde_json::Value::Null,
            url: "https://example.com/42".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let a = Asset::from_new(new.clone());
        let b = Asset::from_new(new.clone());

        assert_ne!(a.id, b.id);
        assert_eq!(a.content(), b.content());
        assert_eq!(a.content(), new);
    }
}
