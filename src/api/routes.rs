use axum::{Router, routing::get, routing::post};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::cors::{CorsLayer, Any};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use crate::api::AppState;
use crate::api::handlers;
use crate::service::storage::IconStorage;

pub fn create_router(state: AppState) -> Router {
    // 预检请求直接返回 200 空响应
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let max_body_bytes = state.config.server.max_body_bytes;

    let mut router = Router::new()
        .route(
            "/create-build",
            post(handlers::build::create_build)
                .fallback(handlers::build::method_not_allowed)
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .route("/health", get(handlers::health::health));

    // 本地存储时由本服务提供图标的公开访问
    if let IconStorage::Local(local) = &state.storage {
        router = router.nest_service("/icons", ServeDir::new(local.dir()));
    }

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        // 非预检响应同样带上允许的方法和请求头
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(cors);

    router
        .layer(middleware)
        .with_state(state)
}
