//! Generic handlers serving one collection.
//!
//! ```text
//! POST   /{c}            create            -> 200 record
//! GET    /{c}            find ?filter=     -> 200 [record]
//! PATCH  /{c}            updateAll ?where= -> 200 {count}
//! GET    /{c}/count      count ?where=     -> 200 {count}
//! GET    /{c}/:id        findById ?filter= -> 200 record
//! PATCH  /{c}/:id        updateById        -> 204
//! PUT    /{c}/:id        replaceById       -> 204
//! DELETE /{c}/:id        deleteById        -> 204
//! ```

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::types::Count;
use models::CrudEntity;
use serde_json::Value;
use service::CrudService;

use crate::errors::JsonApiError;
use crate::routes::params::{FilterParams, WhereParams};

type Svc<E> = State<Arc<CrudService<E>>>;
type ApiResult<T> = Result<T, JsonApiError>;

/// The eight CRUD routes of `E`, mounted under `/{E::COLLECTION}`.
pub fn collection_router<E: CrudEntity>(svc: Arc<CrudService<E>>) -> Router {
    let base = format!("/{}", E::COLLECTION);
    Router::new()
        .route(&base, post(create::<E>).get(find::<E>).patch(update_all::<E>))
        .route(&format!("{base}/count"), get(count::<E>))
        .route(
            &format!("{base}/:id"),
            get(find_by_id::<E>).patch(update_by_id::<E>).put(replace_by_id::<E>).delete(delete_by_id::<E>),
        )
        .with_state(svc)
}

async fn create<E: CrudEntity>(
    State(svc): Svc<E>,
    body: Result<Json<E::Input>, JsonRejection>,
) -> ApiResult<Json<E::Model>> {
    let Json(input) = body?;
    Ok(Json(svc.create(input).await?))
}

async fn count<E: CrudEntity>(
    State(svc): Svc<E>,
    params: Result<Query<WhereParams>, QueryRejection>,
) -> ApiResult<Json<Count>> {
    let Query(params) = params?;
    let w = params.parse()?;
    let count = svc.count(w.as_ref()).await?;
    Ok(Json(Count { count }))
}

async fn find<E: CrudEntity>(
    State(svc): Svc<E>,
    params: Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Value>>> {
    let Query(params) = params?;
    let filter = params.parse()?;
    Ok(Json(svc.find(&filter).await?))
}

async fn update_all<E: CrudEntity>(
    State(svc): Svc<E>,
    params: Result<Query<WhereParams>, QueryRejection>,
    body: Result<Json<E::Patch>, JsonRejection>,
) -> ApiResult<Json<Count>> {
    let Query(params) = params?;
    let w = params.parse()?;
    let Json(patch) = body?;
    let count = svc.update_all(patch, w.as_ref()).await?;
    Ok(Json(Count { count }))
}

async fn find_by_id<E: CrudEntity>(
    State(svc): Svc<E>,
    id: Result<Path<i64>, PathRejection>,
    params: Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Query(params) = params?;
    let filter = params.parse()?;
    Ok(Json(svc.find_by_id(id, Some(&filter)).await?))
}

async fn update_by_id<E: CrudEntity>(
    State(svc): Svc<E>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<E::Patch>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let Json(patch) = body?;
    svc.update_by_id(id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_by_id<E: CrudEntity>(
    State(svc): Svc<E>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<E::Input>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let Json(input) = body?;
    svc.replace_by_id(id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_by_id<E: CrudEntity>(
    State(svc): Svc<E>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    svc.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
