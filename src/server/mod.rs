// Web服务器模块

pub mod handlers;
pub mod state;

pub use state::AppState;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// 构建 CORS 层
///
/// 配置了允许源时按列表放行，空列表放行所有来源
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parse_origins(origins))
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 解析配置的源列表，非法条目跳过并告警
fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("忽略非法的 CORS 源: {}", origin);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_keeps_valid_entries() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://files.example.com".to_string(),
        ];
        let parsed = parse_origins(&origins);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], HeaderValue::from_static("http://localhost:3000"));
    }

    #[test]
    fn test_parse_origins_drops_invalid_entries() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "bad\norigin".to_string(),
        ];
        let parsed = parse_origins(&origins);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_cors_layer_builds_for_both_modes() {
        // 空列表放行所有，非空列表按配置放行
        let _any = cors_layer(&[]);
        let _restricted = cors_layer(&["http://localhost:3000".to_string()]);
    }
}
