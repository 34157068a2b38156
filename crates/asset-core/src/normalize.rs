//! 마켓플레이스 레코드 정규화 헬퍼.
//!
//! 각 어댑터는 필드 매핑이 다르지만 다음 규칙은 공통으로 따릅니다:
//! - 타임스탬프가 없거나 파싱할 수 없으면 현재 시각으로 대체
//! - 이미지 URL은 후보 중 첫 번째 비어 있지 않은 값, 없으면 빈 문자열

use chrono::{DateTime, NaiveDateTime, Utc};

/// 소스 타임스탬프 파싱. 실패 시 현재 시각 반환.
///
/// RFC 3339 (`2023-04-01T12:00:00Z`, `+09:00` 오프셋 포함)과
/// 오프셋 없는 ISO 형식 (`2023-04-01T12:00:00.123456`, UTC로 간주)을 지원합니다.
pub fn parse_timestamp_or_now(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(parse_timestamp).unwrap_or_else(Utc::now)
}

/// 소스 타임스탬프 파싱.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// 후보 중 첫 번째 비어 있지 않은 문자열. 없으면 빈 문자열.
pub fn first_non_empty<'a, I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}
