use std::sync::Arc;

use crate::errors::Error;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

pub async fn auth(State(api_key): State<Arc<str>>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*api_key);

    if authorized {
        return next.run(req).await;
    }

    Error::Unauthorized.into_response()
}
