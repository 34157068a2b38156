//! # Asset Core
//!
//! 마켓플레이스 에셋 동기화 엔진의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 동기화 엔진 전반에서 사용되는 기본 타입을 제공합니다:
//! - 마켓플레이스 종류 및 컬렉션 정의
//! - 정규화된 에셋 레코드
//! - 타임스탬프/문자열 정규화 헬퍼
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod normalize;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use normalize::*;
