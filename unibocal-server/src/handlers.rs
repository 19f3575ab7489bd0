use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use unibocal_core::{
    CalendarRequest, Course, Error, ErrorKind, ics::ICS_CONTENT_TYPE, service::CalendarService,
};

const CALENDAR_DISPOSITION: &str = "attachment; filename=lezioni.ics";

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CalendarService>,
}

/// 健康检查响应
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    courses: usize,
}

/// 错误响应
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// 日历请求参数
#[derive(Debug, Default, Deserialize)]
struct CalendarQuery {
    /// 培养方案
    curr: Option<String>,
    /// 逗号分隔的科目代码
    subjects: Option<String>,
}

pub fn create_app(service: Arc<CalendarService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/courses", get(list_courses_handler))
        .route("/courses/{id}", get(course_page_handler))
        .route("/cal/{id}/{year}", get(calendar_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// 根路径处理器
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Unibocal Calendar Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Università di Bologna lecture timetables as iCalendar feeds",
        "endpoints": {
            "health": "/health",
            "courses": "/courses",
            "course": "/courses/{id}",
            "calendar": "/cal/{id}/{year}?curr=&subjects="
        }
    }))
}

/// 健康检查处理器
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        courses: state.service.catalog().len(),
    })
}

/// 课程列表，按代码降序
async fn list_courses_handler(State(state): State<AppState>) -> Json<Vec<Course>> {
    Json(
        state
            .service
            .catalog()
            .list()
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn course_page_handler(
    Path(id): Path<u32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.service.course_page(id).await?;
    Ok(Json(page))
}

/// 课程日历
async fn calendar_handler(
    Path((id, year)): Path<(u32, u32)>,
    Query(params): Query<CalendarQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut request = CalendarRequest::new(id, year);
    if let Some(curr) = params.curr.filter(|c| !c.is_empty()) {
        request = request.with_curriculum(curr);
    }
    if let Some(subjects) = params.subjects.as_deref() {
        request = request.with_subjects_query(subjects);
    }

    let bytes = state.service.lecture_calendar(&request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, ICS_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, CALENDAR_DISPOSITION),
        ],
        bytes.to_vec(),
    ))
}

/// 应用错误类型
#[derive(Debug)]
struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match (&self.0, self.0.kind()) {
            (Error::Timeout, _) => (StatusCode::GATEWAY_TIMEOUT, "upstream timeout"),
            (_, ErrorKind::NotFound) => (StatusCode::NOT_FOUND, "not found"),
            (_, ErrorKind::InvalidRequest) => (StatusCode::BAD_REQUEST, "invalid request"),
            (_, ErrorKind::Upstream) => (StatusCode::BAD_GATEWAY, "upstream unavailable"),
            (_, ErrorKind::Malformed) => (StatusCode::BAD_GATEWAY, "malformed upstream data"),
            (_, ErrorKind::Internal) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
