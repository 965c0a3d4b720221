use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use service::dashboard::{
    AdminStats, CustomerDashboard, CustomerDashboardStats, CustomerStats, ProfessionalDashboard, ProfessionalDashboardStats,
};
use service::jobs::JobSummary;
use service::views::{
    PartyView, ProfessionalPublic, RequestDetail, ReviewView, ServiceBrief, ServiceView, UserSummary, UserView,
};

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    /// `customer` (default) or `professional`
    pub role: Option<String>,
    pub services: Option<Vec<String>>,
    pub experience: Option<i32>,
    pub about: Option<String>,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub services: Option<Vec<String>>,
    pub experience: Option<i32>,
    pub about: Option<String>,
}

#[derive(ToSchema)]
pub struct CreateRequestBody {
    pub service_id: i32,
    /// `YYYY-MM-DD`
    pub preferred_date: String,
    pub address: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub professional_id: Option<i32>,
}

#[derive(ToSchema)]
pub struct ReviewRequest { pub service_request_id: i32, pub rating: i32, pub comment: Option<String> }

#[derive(ToSchema)]
pub struct NewServiceRequest {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::admin_login,
        crate::routes::auth::refresh,
        crate::routes::auth::profile,
        crate::routes::auth::update_profile,
        crate::routes::auth::me,
        crate::routes::catalog::list,
        crate::routes::catalog::search,
        crate::routes::catalog::categories,
        crate::routes::catalog::get,
        crate::routes::public::professionals,
        crate::routes::public::service_requests,
        crate::routes::customer::dashboard,
        crate::routes::customer::create_request,
        crate::routes::customer::get_request,
        crate::routes::customer::update_request,
        crate::routes::customer::list_requests,
        crate::routes::customer::cancel_request,
        crate::routes::customer::submit_review,
        crate::routes::customer::profile,
        crate::routes::customer::update_profile,
        crate::routes::customer::professionals_for_service,
        crate::routes::customer::stats,
        crate::routes::professional::dashboard,
        crate::routes::professional::list_requests,
        crate::routes::professional::accept,
        crate::routes::professional::reject,
        crate::routes::professional::complete,
        crate::routes::professional::profile,
        crate::routes::professional::update_profile,
        crate::routes::admin::dashboard,
        crate::routes::admin::list_services,
        crate::routes::admin::create_service,
        crate::routes::admin::update_service,
        crate::routes::admin::delete_service,
        crate::routes::admin::list_bookings,
        crate::routes::admin::update_booking,
        crate::routes::admin::list_users,
        crate::routes::admin::create_user,
        crate::routes::admin::update_user,
        crate::routes::admin::delete_user,
        crate::routes::admin::toggle_user_status,
        crate::routes::admin::list_professionals,
        crate::routes::admin::pending_professionals,
        crate::routes::admin::approve_professional,
        crate::routes::admin::block_professional,
        crate::routes::admin::unblock_professional,
        crate::routes::admin::search_professionals,
        crate::routes::admin::start_export,
        crate::routes::admin::get_export,
        crate::routes::admin::run_daily_reminders,
        crate::routes::admin::run_monthly_reports,
        crate::routes::admin::run_test_email,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            ProfileUpdateRequest,
            CreateRequestBody,
            ReviewRequest,
            NewServiceRequest,
            UserView,
            UserSummary,
            ProfessionalPublic,
            ServiceView,
            ServiceBrief,
            PartyView,
            ReviewView,
            RequestDetail,
            AdminStats,
            CustomerDashboard,
            CustomerDashboardStats,
            CustomerStats,
            ProfessionalDashboard,
            ProfessionalDashboardStats,
            JobSummary,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "catalog"),
        (name = "public"),
        (name = "customer"),
        (name = "professional"),
        (name = "admin")
    )
)]
pub struct ApiDoc;
