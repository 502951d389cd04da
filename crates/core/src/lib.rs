//! yair 공통 크레이트
//!
//! 설정 문서([`YairConfig`]), 설정 에러 타입, 심각도([`Severity`]) 등
//! 스캐너와 CLI가 함께 사용하는 타입을 정의합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, YairError};

// 설정
pub use config::YairConfig;

// 도메인 타입
pub use types::{Severity, Vulnerability};
