use crate::{
    api::models::*,
    auth::jwt::bearer_token,
    core::{
        errors::ExpenseError,
        models::{
            audit::GroupAudit, expense::PersonalExpense, group::Group, group_expense::GroupExpense,
            settlement::Settlement, user::UserProfile,
        },
        services::{AuthResponse, ExpenseService, GroupExpenseUpdate, NewGroupExpense, NewUser},
    },
    infrastructure::{
        cache::in_memory::InMemoryCache, logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage,
    },
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use http::header;
use std::sync::Arc;
use tracing::debug;

pub type AppService = ExpenseService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

/// The caller, as established by [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

// Accepts `Bearer <token>` as well as a bare token.
async fn auth_middleware(
    State(service): State<Arc<AppService>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ExpenseError::InvalidToken("Missing Authorization header".to_string()))?;

    let claims = service.validate_token(token)?;
    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        username: claims.username,
    });
    Ok(next.run(req).await)
}

pub fn api_routes(service: Arc<AppService>) -> Router {
    let protected_routes = Router::new()
        .route("/users/profile", get(get_profile))
        .route("/users/update_budget", put(update_budget))
        .route("/users/get_budget", get(get_budget))
        .route("/personal_expenses", get(list_expenses))
        .route("/personal_expenses/add", post(add_expense))
        .route("/personal_expenses/edit/{expense_id}", put(edit_expense))
        .route("/personal_expenses/delete/{expense_id}", delete(delete_expense))
        .route("/dashboard/get_expenses", get(get_expenses_in_range))
        .route("/dashboard/get_all_expenses", get(get_all_expenses))
        .route("/dashboard/get_budget", get(get_budget))
        .route("/groups", get(list_groups))
        .route("/groups/create", post(create_group))
        .route("/groups/join", post(join_group))
        .route("/groups/{group_id}", get(get_group))
        .route("/groups/{group_id}/delete", delete(delete_group))
        .route("/groups/{group_id}/invite", post(invite_to_group))
        .route("/groups/{group_id}/members", get(get_group_members))
        .route("/groups/{group_id}/add_expense", post(add_group_expense))
        .route("/groups/{group_id}/expenses", get(list_group_expenses))
        .route(
            "/groups/{group_id}/edit_expense/{expense_id}",
            put(edit_group_expense),
        )
        .route(
            "/groups/{group_id}/expenses/{expense_id}",
            delete(delete_group_expense),
        )
        .route(
            "/groups/{group_id}/settlement_summary",
            get(get_settlement_summary),
        )
        .route("/groups/{group_id}/audits", get(get_group_audits))
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/verify_token", post(verify_token))
        .merge(protected_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = NewUser,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Username or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn register(
    State(service): State<Arc<AppService>>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = service.register_user(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn login(
    State(service): State<Arc<AppService>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(service.login(&req.username, &req.password).await?))
}

#[utoipa::path(
    post,
    path = "/api/verify_token",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
async fn verify_token(
    State(service): State<Arc<AppService>>,
    Json(req): Json<VerifyTokenRequest>,
) -> Result<Json<VerifyTokenResponse>, ApiError> {
    let claims = service.validate_token(&req.token)?;
    Ok(Json(VerifyTokenResponse {
        user_id: claims.sub,
        username: claims.username,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Profile of the caller", body = UserProfile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_profile(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(service.get_profile(&user.user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/update_budget",
    request_body = BudgetBody,
    responses(
        (status = 200, description = "Budget updated", body = BudgetBody),
        (status = 400, description = "Invalid budget", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn update_budget(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BudgetBody>,
) -> Result<Json<BudgetBody>, ApiError> {
    let budget = service.update_budget(&user.user_id, req.budget).await?;
    Ok(Json(BudgetBody { budget }))
}

#[utoipa::path(
    get,
    path = "/api/users/get_budget",
    responses(
        (status = 200, description = "Current budget", body = BudgetBody),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_budget(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BudgetBody>, ApiError> {
    let budget = service.get_budget(&user.user_id).await?;
    Ok(Json(BudgetBody { budget }))
}

#[utoipa::path(
    get,
    path = "/api/personal_expenses",
    responses(
        (status = 200, description = "Expenses of the caller, newest first", body = [PersonalExpense]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn list_expenses(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PersonalExpense>>, ApiError> {
    Ok(Json(service.list_expenses(&user.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/personal_expenses/add",
    request_body = AddExpenseRequest,
    responses(
        (status = 201, description = "Expense added", body = PersonalExpense),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn add_expense(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AddExpenseRequest>,
) -> Result<(StatusCode, Json<PersonalExpense>), ApiError> {
    let expense = service
        .add_expense(&user.user_id, req.amount, req.name, req.date, req.category)
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[utoipa::path(
    put,
    path = "/api/personal_expenses/edit/{expense_id}",
    request_body = EditExpenseRequest,
    params(
        ("expense_id" = String, Path, description = "ID of the expense to edit")
    ),
    responses(
        (status = 200, description = "Expense updated", body = PersonalExpense),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn edit_expense(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(expense_id): Path<String>,
    Json(req): Json<EditExpenseRequest>,
) -> Result<Json<PersonalExpense>, ApiError> {
    let expense = service
        .edit_expense(&user.user_id, &expense_id, req.amount, req.name, req.date)
        .await?;
    Ok(Json(expense))
}

#[utoipa::path(
    delete,
    path = "/api/personal_expenses/delete/{expense_id}",
    params(
        ("expense_id" = String, Path, description = "ID of the expense to delete")
    ),
    responses(
        (status = 200, description = "Expense deleted"),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn delete_expense(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(expense_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.delete_expense(&user.user_id, &expense_id).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/dashboard/get_expenses",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Expenses in range, oldest first", body = [PersonalExpense]),
        (status = 400, description = "Invalid range", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_expenses_in_range(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Vec<PersonalExpense>>, ApiError> {
    debug!(user_id = %user.user_id, ?range, "dashboard range query");
    let expenses = service
        .expenses_between(&user.user_id, range.start, range.end)
        .await?;
    Ok(Json(expenses))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/get_all_expenses",
    responses(
        (status = 200, description = "All expenses, oldest first", body = [PersonalExpense])
    ),
    security(("Bearer" = []))
)]
async fn get_all_expenses(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PersonalExpense>>, ApiError> {
    Ok(Json(service.expenses_between(&user.user_id, None, None).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups",
    responses(
        (status = 200, description = "Groups the caller belongs to", body = [Group])
    ),
    security(("Bearer" = []))
)]
async fn list_groups(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Group>>, ApiError> {
    Ok(Json(service.list_user_groups(&user.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups/create",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 400, description = "Bad request", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn create_group(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let group = service.create_group(&user.user_id, req.name).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}",
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 200, description = "Group details", body = Group),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_group(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(service.get_group(&user.user_id, &group_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{group_id}/delete",
    params(
        ("group_id" = String, Path, description = "ID of the group to delete")
    ),
    responses(
        (status = 200, description = "Group deleted"),
        (status = 403, description = "Not group admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn delete_group(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.delete_group(&user.user_id, &group_id).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/invite",
    request_body = InviteRequest,
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 200, description = "Invitation key issued", body = InviteResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn invite_to_group(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteResponse>, ApiError> {
    let api_key = service.invite_to_group(&user.user_id, &group_id, &req.email).await?;
    Ok(Json(InviteResponse { api_key }))
}

#[utoipa::path(
    post,
    path = "/api/groups/join",
    request_body = JoinGroupRequest,
    responses(
        (status = 200, description = "Joined group", body = Group),
        (status = 404, description = "Invalid join key", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn join_group(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<JoinGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(service.join_group(&user.user_id, &req.api_key).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/members",
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 200, description = "Member profiles, admin first", body = [UserProfile]),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_group_members(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    Ok(Json(service.group_members(&user.user_id, &group_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/add_expense",
    request_body = NewGroupExpense,
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 201, description = "Group expense added", body = GroupExpense),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 422, description = "Split does not add up", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn add_group_expense(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
    Json(req): Json<NewGroupExpense>,
) -> Result<(StatusCode, Json<GroupExpense>), ApiError> {
    let expense = service.add_group_expense(&user.user_id, &group_id, req).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/expenses",
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 200, description = "Group expenses, newest first", body = [GroupExpense]),
        (status = 403, description = "Not a group member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn list_group_expenses(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<GroupExpense>>, ApiError> {
    Ok(Json(service.list_group_expenses(&user.user_id, &group_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/groups/{group_id}/edit_expense/{expense_id}",
    request_body = GroupExpenseUpdate,
    params(
        ("group_id" = String, Path, description = "ID of the group"),
        ("expense_id" = String, Path, description = "ID of the group expense")
    ),
    responses(
        (status = 200, description = "Group expense updated", body = GroupExpense),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Group expense not found", body = ErrorResponse),
        (status = 422, description = "Split does not add up", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn edit_group_expense(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path((group_id, expense_id)): Path<(String, String)>,
    Json(req): Json<GroupExpenseUpdate>,
) -> Result<Json<GroupExpense>, ApiError> {
    let expense = service
        .edit_group_expense(&user.user_id, &group_id, &expense_id, req)
        .await?;
    Ok(Json(expense))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{group_id}/expenses/{expense_id}",
    params(
        ("group_id" = String, Path, description = "ID of the group"),
        ("expense_id" = String, Path, description = "ID of the group expense")
    ),
    responses(
        (status = 200, description = "Group expense deleted"),
        (status = 404, description = "Group expense not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn delete_group_expense(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path((group_id, expense_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    service
        .delete_group_expense(&user.user_id, &group_id, &expense_id)
        .await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/settlement_summary",
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 200, description = "Payments that settle the group, by username", body = [Settlement]),
        (status = 403, description = "Not a group member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_settlement_summary(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<Settlement>>, ApiError> {
    Ok(Json(service.settlement_summary(&user.user_id, &group_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/audits",
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 200, description = "Audit trail of the group", body = [GroupAudit]),
        (status = 403, description = "Not a group member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_group_audits(
    State(service): State<Arc<AppService>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<GroupAudit>>, ApiError> {
    Ok(Json(service.get_group_audits(&user.user_id, &group_id).await?))
}
