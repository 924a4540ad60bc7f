pub mod cleanup;

use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use log::{info, warn};

use crate::{errors::Result, keys, middlewares, server::ExportServer};

pub async fn healthcheck() -> String {
    info!("Health check endpoint hit");

    "ok".to_string()
}

/// 组装全部路由。`api_key` 为空时不启用认证。
pub fn app(server: Arc<ExportServer>, api_key: &str) -> Result<Router> {
    let mut api = Router::new().nest("/api/cleanup-export", server.routes());

    api = if api_key.is_empty() {
        warn!("API authentication is not enabled (dangerous!)");
        api
    } else {
        info!("API authentication is enabled");
        keys::check_key(api_key)?;
        api.route_layer(middleware::from_fn_with_state(
            Arc::<str>::from(api_key),
            middlewares::auth,
        ))
    };

    // 健康检查不需要认证
    Ok(api.route("/api/healthcheck", get(healthcheck)))
}
