use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::models::{
        AddExpenseRequest, BudgetBody, CreateGroupRequest, EditExpenseRequest, ErrorResponse, InviteRequest,
        InviteResponse, JoinGroupRequest, LoginRequest, VerifyTokenRequest, VerifyTokenResponse,
    },
    core::{
        models::{
            audit::GroupAudit, expense::PersonalExpense, group::Group, group_expense::GroupExpense,
            settlement::Settlement, user::UserProfile,
        },
        services::{AuthResponse, GroupExpenseUpdate, NewGroupExpense, NewUser},
        split::{SplitDetail, SplitMethod},
    },
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::register,
        super::handlers::login,
        super::handlers::verify_token,
        super::handlers::get_profile,
        super::handlers::update_budget,
        super::handlers::get_budget,
        super::handlers::list_expenses,
        super::handlers::add_expense,
        super::handlers::edit_expense,
        super::handlers::delete_expense,
        super::handlers::get_expenses_in_range,
        super::handlers::get_all_expenses,
        super::handlers::list_groups,
        super::handlers::create_group,
        super::handlers::get_group,
        super::handlers::delete_group,
        super::handlers::invite_to_group,
        super::handlers::join_group,
        super::handlers::get_group_members,
        super::handlers::add_group_expense,
        super::handlers::list_group_expenses,
        super::handlers::edit_group_expense,
        super::handlers::delete_group_expense,
        super::handlers::get_settlement_summary,
        super::handlers::get_group_audits
    ),
    components(schemas(
        NewUser,
        LoginRequest,
        AuthResponse,
        VerifyTokenRequest,
        VerifyTokenResponse,
        BudgetBody,
        AddExpenseRequest,
        EditExpenseRequest,
        CreateGroupRequest,
        InviteRequest,
        InviteResponse,
        JoinGroupRequest,
        NewGroupExpense,
        GroupExpenseUpdate,
        ErrorResponse,
        UserProfile,
        PersonalExpense,
        Group,
        GroupExpense,
        SplitMethod,
        SplitDetail,
        Settlement,
        GroupAudit
    )),
    modifiers(&BearerAuth),
    info(
        title = "Expense Monitor API",
        description = "API for personal expenses, shared group expenses and settlements",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
