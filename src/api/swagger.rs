use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Plant Tracker API",
        version = "1.0.0",
        description = "Backend for the Plant Tracker mobile app. \n\n**Authentication:** every `/api` endpoint except register and login requires a JWT Bearer token.\n\n**Features:**\n- Geotagged plant captures with photo upload\n- Location buckets at 6-decimal precision\n- Proximity search by radius in meters\n- Optional mirroring of captures into the user's Google Sheet"
    ),
    paths(
        // Auth endpoints
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::get_me,
        crate::api::auth::update_spreadsheet,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Fields
        crate::api::fields::create_field,
        crate::api::fields::list_fields,

        // Plants
        crate::api::plants::capture_plant,
        crate::api::plants::list_plants,
        crate::api::plants::list_locations,
        crate::api::plants::plants_at_location,
        crate::api::plants::sync_status,

        // Sheets
        crate::api::sheets::get_records,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::UpdateSpreadsheetRequest,
            crate::services::auth_service::AuthResponse,
            crate::models::UserInfo,

            // Health
            crate::api::health::HealthResponse,

            // Fields
            crate::models::Field,
            crate::models::CreateFieldRequest,
            crate::models::CreateFieldResponse,

            // Plants
            crate::models::PlantObservation,
            crate::models::LocationSummary,
            crate::models::SyncStatus,
            crate::models::CaptureResponse,
            crate::models::SyncStatusResponse,
            crate::api::plants::CaptureUpload,

            // Sheets
            crate::api::sheets::SheetRecordsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and the linked spreadsheet of the current user."),
        (name = "Health", description = "Health check and sync job metrics."),
        (name = "Fields", description = "Named sub-areas of a farm."),
        (name = "Plants", description = "Plant captures, location buckets, proximity search and sync state."),
        (name = "Sheets", description = "Rows mirrored into the user's Google Sheet."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from /api/auth/login or /api/auth/register"))
                        .build()
                ),
            );
        }
    }
}
