//! 外部集成：HTTP 接口（需 feature `server`）

#[cfg(feature = "server")]
pub mod http;
