//! Goods HTTP handlers.
//!
//! Thin adapters: parse path/query/body, call `GoodsService`, map errors
//! through `ApiError`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::common::{GoodId, ListQuery, ProjectId, SortDirection, DEFAULT_LIMIT, DEFAULT_OFFSET};
use crate::domains::goods::{Good, GoodChanges, GoodsPage};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct ProjectParams {
    project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    project_id: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGoodRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReprioritizeRequest {
    #[serde(rename = "newPriority")]
    pub new_priority: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityEntry {
    pub id: GoodId,
    pub priority: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReprioritizeResponse {
    pub priorities: Vec<PriorityEntry>,
}

/// POST /good/create?project_id=
pub async fn create_good(
    Extension(state): Extension<AppState>,
    Query(params): Query<ProjectParams>,
    body: Result<Json<CreateGoodRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Good>)> {
    let project_id = parse_project_id(params.project_id.as_deref())?;
    let Json(request) = body?;

    let good = state.goods.create(project_id, request.name).await?;
    Ok((StatusCode::CREATED, Json(good)))
}

/// GET /good/:id
pub async fn get_good(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Good>> {
    let id = parse_good_id(&id)?;
    Ok(Json(state.goods.get(id).await?))
}

/// PATCH /good/update/:id?project_id=
pub async fn update_good(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ProjectParams>,
    body: Result<Json<GoodChanges>, JsonRejection>,
) -> ApiResult<Json<Good>> {
    let id = parse_good_id(&id)?;
    let project_id = parse_project_id(params.project_id.as_deref())?;
    let Json(changes) = body?;

    Ok(Json(state.goods.update(id, project_id, changes).await?))
}

/// DELETE /good/remove/:id?project_id=
pub async fn remove_good(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ProjectParams>,
) -> ApiResult<Json<Good>> {
    let id = parse_good_id(&id)?;
    let project_id = parse_project_id(params.project_id.as_deref())?;

    Ok(Json(state.goods.delete(id, project_id).await?))
}

/// GET /goods/list?project_id=&limit=&offset=&sort=
pub async fn list_goods(
    Extension(state): Extension<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<GoodsPage>> {
    let query = parse_list_query(&params)?;
    Ok(Json(state.goods.list(query).await?))
}

/// PATCH /goods/:id/reprioritize?project_id=
pub async fn reprioritize_good(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ProjectParams>,
    body: Result<Json<ReprioritizeRequest>, JsonRejection>,
) -> ApiResult<Json<ReprioritizeResponse>> {
    let id = parse_good_id(&id)?;
    let project_id = parse_project_id(params.project_id.as_deref())?;
    let Json(request) = body?;

    let affected = state
        .goods
        .reprioritize(id, project_id, request.new_priority)
        .await?;

    Ok(Json(ReprioritizeResponse {
        priorities: affected
            .into_iter()
            .map(|g| PriorityEntry {
                id: g.id,
                priority: g.priority,
            })
            .collect(),
    }))
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse::<i64>().ok().filter(|v| *v > 0)
}

fn parse_good_id(raw: &str) -> ApiResult<GoodId> {
    parse_positive(Some(raw))
        .map(GoodId::new)
        .ok_or_else(|| ApiError::bad_request("invalid id"))
}

fn parse_project_id(raw: Option<&str>) -> ApiResult<ProjectId> {
    parse_positive(raw)
        .map(ProjectId::new)
        .ok_or_else(|| ApiError::bad_request("invalid project id"))
}

fn parse_list_query(params: &ListParams) -> ApiResult<ListQuery> {
    let project_id = parse_project_id(params.project_id.as_deref())?;

    let limit = match params.limit.as_deref() {
        None => DEFAULT_LIMIT,
        Some(raw) => {
            parse_positive(Some(raw)).ok_or_else(|| ApiError::bad_request("invalid limit"))?
        }
    };

    let offset = match params.offset.as_deref() {
        None => DEFAULT_OFFSET,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 0)
            .ok_or_else(|| ApiError::bad_request("invalid offset"))?,
    };

    let sort = match params.sort.as_deref() {
        None => SortDirection::Asc,
        Some(raw) => raw
            .parse::<SortDirection>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
    };

    Ok(ListQuery::new(project_id, limit, offset, sort))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<&str>, offset: Option<&str>, sort: Option<&str>) -> ListParams {
        ListParams {
            project_id: Some("42".into()),
            limit: limit.map(Into::into),
            offset: offset.map(Into::into),
            sort: sort.map(Into::into),
        }
    }

    fn bad_request_message(result: ApiResult<ListQuery>) -> String {
        match result {
            Err(ApiError::BadRequest(message)) => message,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_list_defaults() {
        let query = parse_list_query(&params(None, None, None)).unwrap();
        assert_eq!(query, ListQuery::first_page(ProjectId::new(42)));
    }

    #[test]
    fn test_list_rejects_bad_params() {
        assert_eq!(
            bad_request_message(parse_list_query(&params(Some("0"), None, None))),
            "invalid limit"
        );
        assert_eq!(
            bad_request_message(parse_list_query(&params(None, Some("-1"), None))),
            "invalid offset"
        );
        assert_eq!(
            bad_request_message(parse_list_query(&params(None, None, Some("sideways")))),
            "invalid sort"
        );
        assert_eq!(
            bad_request_message(parse_list_query(&ListParams::default())),
            "invalid project id"
        );
    }

    #[test]
    fn test_id_parsing() {
        assert_eq!(parse_good_id("17").unwrap(), GoodId::new(17));
        assert!(parse_good_id("0").is_err());
        assert!(parse_good_id("abc").is_err());
        assert!(parse_project_id(None).is_err());
    }
}
