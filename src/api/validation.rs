//! リクエストの抽出と検証
//!
//! ハンドラー本体の前に実行され、失敗した場合は [`ApiError`] で短絡する。

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::error::ApiError;

/// JSONボディを受け取り、`validator` のルールで検証するエクストラクター
///
/// 構文・型のエラーは `BadRequest`、ルール違反は全項目を列挙した `Validation` になる。
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// パスパラメータのエクストラクター
///
/// 型変換に失敗した場合も共通のエラー形式で400を返す。
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
