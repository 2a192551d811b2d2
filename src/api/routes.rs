//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{ModuleContent, ModuleOrder, NewCourse, NewModule, NewUser};
use crate::domain::patch::{non_blank, parse_price};
use crate::domain::{
    CoursePatch, Credit, DomainError, MoneyError, ModulePatch, OperationContext, Price, UserPatch,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{PurchaseCommand, SetCompletionCommand};
use crate::pagination::{PageRequest, PaginationError};

use super::forms::FormData;
use super::middleware::{AuthenticatedApiKey, RequestUser};
use super::response::ApiResponse;
use super::state::AppState;

// =========================================================================
// Request types
// =========================================================================

/// `?page=&limit=&q=` kept as raw strings so a non-numeric value is a 400
/// with our error body rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

impl ListParams {
    pub fn page_request(&self) -> Result<PageRequest, PaginationError> {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }

    pub fn search(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or("")
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(request: UpdateUserRequest) -> Self {
        UserPatch {
            username: non_blank(request.username),
            email: non_blank(request.email),
            first_name: non_blank(request.first_name),
            last_name: non_blank(request.last_name),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncrementBalanceRequest {
    pub increment: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReorderModulesRequest {
    pub module_order: Vec<ModuleOrder>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteModuleRequest {
    pub is_completed: bool,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Users (admin)
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/balance", post(increment_balance))
        // Courses
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/my-courses", get(list_my_courses))
        .route(
            "/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/:id/buy", post(buy_course))
        .route("/courses/:id/progress", get(get_course_progress))
        // Modules
        .route(
            "/courses/:id/modules",
            get(list_modules).post(create_module),
        )
        .route("/courses/:id/modules/reorder", patch(reorder_modules))
        .route(
            "/modules/:id",
            get(get_module).put(update_module).delete(delete_module),
        )
        .route("/modules/:id/complete", patch(complete_module))
}

fn require_admin(api_key: &AuthenticatedApiKey) -> AppResult<()> {
    if api_key.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("admin permission required".to_string()))
    }
}

fn require_user(request_user: Option<Extension<RequestUser>>) -> AppResult<Uuid> {
    request_user
        .map(|Extension(user)| user.user_id)
        .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))
}

fn invalid_price(e: MoneyError) -> AppError {
    DomainError::invalid_input(format!("price: {e}")).into()
}

// =========================================================================
// Users
// =========================================================================

async fn list_users(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let page = state
        .users()
        .list(params.page_request()?, params.search())
        .await?;
    Ok(ApiResponse::page("users retrieved successfully", page))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let user = state
        .users()
        .create(NewUser {
            username: request.username,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
        })
        .await?;
    Ok(ApiResponse::created("user created successfully", user))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let user = state.users().get(id).await?;
    Ok(ApiResponse::ok("user retrieved successfully", user))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let user = state.users().update(id, request.into()).await?;
    Ok(ApiResponse::ok("user updated successfully", user))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    state.users().delete(id).await?;
    Ok(ApiResponse::ok("user deleted successfully", ()))
}

async fn increment_balance(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
    Json(request): Json<IncrementBalanceRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let credit = Credit::new(request.increment)
        .map_err(|e| DomainError::invalid_input(format!("increment: {e}")))?;
    let user = state.users().increment_balance(id, credit).await?;
    Ok(ApiResponse::ok("user balance updated", user))
}

// =========================================================================
// Courses
// =========================================================================

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let page = state
        .courses()
        .list(params.page_request()?, params.search())
        .await?;
    Ok(ApiResponse::page("courses retrieved successfully", page))
}

async fn list_my_courses(
    State(state): State<AppState>,
    request_user: Option<Extension<RequestUser>>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user(request_user)?;
    let page = state
        .ledger()
        .list_my_courses(user_id, params.page_request()?, params.search())
        .await?;
    Ok(ApiResponse::page("my courses retrieved successfully", page))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let course = state.courses().get(id).await?;
    Ok(ApiResponse::ok("course retrieved successfully", course))
}

async fn create_course(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let mut form = FormData::read(multipart).await?;

    let price: Price = form.required("price")?.parse().map_err(invalid_price)?;
    let input = NewCourse {
        title: form.required("title")?,
        description: form.required("description")?,
        instructor: form.required("instructor")?,
        topics: form
            .list("topics")
            .ok_or_else(|| AppError::InvalidRequest("field 'topics' is required".to_string()))?,
        price,
    };
    let thumbnail = form.take_file("thumbnail_image");

    let course = state.courses().create(input, thumbnail).await?;
    Ok(ApiResponse::created("course created successfully", course))
}

async fn update_course(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let mut form = FormData::read(multipart).await?;

    let patch = CoursePatch {
        title: form.text("title"),
        description: form.text("description"),
        instructor: form.text("instructor"),
        topics: form.list("topics"),
        price: parse_price(form.text("price").as_deref()).map_err(invalid_price)?,
        thumbnail_path: None,
    };
    let clear_thumbnail = form.flag("clear_thumbnail");
    let thumbnail = form.take_file("thumbnail_image");

    let course = state
        .courses()
        .update(id, patch, thumbnail, clear_thumbnail)
        .await?;
    Ok(ApiResponse::ok("course updated successfully", course))
}

async fn delete_course(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    state.courses().delete(id).await?;
    Ok(ApiResponse::ok("course deleted successfully", ()))
}

async fn buy_course(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    request_user: Option<Extension<RequestUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user(request_user)?;
    let result = state
        .ledger()
        .purchase(PurchaseCommand::new(user_id, id), &context)
        .await?;
    Ok(ApiResponse::ok("course purchased successfully", result))
}

async fn get_course_progress(
    State(state): State<AppState>,
    request_user: Option<Extension<RequestUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user(request_user)?;
    let progress = state.tracker().course_progress(user_id, id).await?;
    Ok(ApiResponse::ok("course progress retrieved successfully", progress))
}

// =========================================================================
// Modules
// =========================================================================

async fn list_modules(
    State(state): State<AppState>,
    request_user: Option<Extension<RequestUser>>,
    Path(course_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let user_id = require_user(request_user)?;
    let listing = state
        .tracker()
        .list_modules(course_id, user_id, params.page_request()?, params.search())
        .await?;

    Ok(
        ApiResponse::ok("modules retrieved successfully", listing.entries())
            .with_pagination(listing.pagination)
            .into_response(),
    )
}

async fn create_module(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(course_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let mut form = FormData::read(multipart).await?;

    let input = NewModule {
        title: form.required("title")?,
        description: form.required("description")?,
        order: form
            .integer("order")?
            .ok_or_else(|| AppError::InvalidRequest("field 'order' is required".to_string()))?,
    };
    let content = ModuleContent {
        pdf: form.take_file("pdf_content"),
        video: form.take_file("video_content"),
        ..ModuleContent::default()
    };

    let module = state.modules().create(course_id, input, content).await?;
    Ok(ApiResponse::created("module created successfully", module))
}

async fn reorder_modules(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(course_id): Path<Uuid>,
    Json(request): Json<ReorderModulesRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    state
        .modules()
        .reorder(course_id, &request.module_order)
        .await?;
    Ok(ApiResponse::ok(
        "modules reordered successfully",
        request.module_order,
    ))
}

async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let module = state.modules().get(id).await?;
    Ok(ApiResponse::ok("module retrieved successfully", module))
}

async fn update_module(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    let mut form = FormData::read(multipart).await?;

    let patch = ModulePatch {
        title: form.text("title"),
        description: form.text("description"),
        ..ModulePatch::default()
    };
    let content = ModuleContent {
        pdf: form.take_file("pdf_content"),
        video: form.take_file("video_content"),
        clear_pdf: form.flag("clear_pdf"),
        clear_video: form.flag("clear_video"),
    };

    let module = state.modules().update(id, patch, content).await?;
    Ok(ApiResponse::ok("module updated successfully", module))
}

async fn delete_module(
    State(state): State<AppState>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&api_key)?;
    state.modules().delete(id).await?;
    Ok(ApiResponse::ok("module deleted successfully", ()))
}

async fn complete_module(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    request_user: Option<Extension<RequestUser>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteModuleRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user(request_user)?;
    let command = SetCompletionCommand::new(id, user_id).with_completed(request.is_completed);
    let result = state.tracker().set_completion(command, &context).await?;
    Ok(ApiResponse::ok("module completion updated", result))
}
