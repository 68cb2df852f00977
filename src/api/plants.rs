use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use std::path::{Path, PathBuf};

use crate::{
    config::Config,
    database::Database,
    jobs::sheet_sync::{SyncJob, SyncQueue},
    middleware::auth::Claims,
    models::{CaptureResponse, LocationSummary, PlantObservation, PlantQuery, SyncStatus, SyncStatusResponse},
    services::{
        auth_service, field_service,
        plant_service::{self, CaptureForm, PlantFilter},
        sheets_service::SheetRow,
    },
    utils::error::AppError,
};

const PHOTO_FIELD: &str = "photo";
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Multipart layout of `POST /api/plants` (OpenAPI only). Empty text parts count as absent.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct CaptureUpload {
    /// Image file (`image/*`)
    #[schema(value_type = Option<String>, format = Binary)]
    photo: Option<Vec<u8>>,
    latitude: f64,
    longitude: f64,
    field_id: Option<i64>,
    notes: Option<String>,
    plant_type: Option<String>,
    growth_stage: Option<String>,
    height_cm: Option<f64>,
    /// 0..=100
    health_score: Option<i64>,
}

/// Photo part buffered in memory until the rest of the form validates.
struct PhotoUpload {
    original_name: String,
    bytes: Vec<u8>,
}

/// Keeps only the final path component and replaces anything outside `[A-Za-z0-9._-]`.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "photo.jpg".to_string()
    } else {
        cleaned
    }
}

/// `{millis}_{uuid8}_{original}`: único mesmo com o mesmo nome enviado em sequência
fn stored_filename(original_name: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        &id[..8],
        sanitize_filename(original_name)
    )
}

async fn read_capture_form(
    mut payload: Multipart,
    max_upload_bytes: usize,
) -> Result<(CaptureForm, Option<PhotoUpload>), AppError> {
    let mut form = CaptureForm::default();
    let mut photo = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();

        if name == PHOTO_FIELD {
            let original_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .unwrap_or("photo.jpg")
                .to_string();
            let is_image = field
                .content_type()
                .map(|mime| mime.essence_str().starts_with("image/"))
                .unwrap_or(false);

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk
                    .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?;
                if bytes.len() + chunk.len() > max_upload_bytes {
                    return Err(AppError::validation(format!(
                        "Photo exceeds the {} MB upload limit",
                        max_upload_bytes / (1024 * 1024)
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            // Cliente sem foto pode mandar a parte vazia
            if bytes.is_empty() {
                continue;
            }
            if !is_image {
                return Err(AppError::validation("Only image files are allowed"));
            }

            photo = Some(PhotoUpload { original_name, bytes });
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?;
            if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                return Err(AppError::validation(format!("Field '{}' is too large", name)));
            }
            bytes.extend_from_slice(&chunk);
        }
        let value = String::from_utf8(bytes)
            .map_err(|_| AppError::validation(format!("Field '{}' is not valid UTF-8", name)))?;
        form.fields.insert(name, value);
    }

    Ok((form, photo))
}

/// Writes the photo under `upload_dir` and returns the stored path plus the public `/uploads/...` path.
async fn save_photo(upload_dir: &Path, photo: &PhotoUpload) -> Result<(PathBuf, String), AppError> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;

    let filename = stored_filename(&photo.original_name);
    let path = upload_dir.join(&filename);
    tokio::fs::write(&path, &photo.bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store photo: {}", e)))?;

    Ok((path, format!("/uploads/{}", filename)))
}

/// Queues the sheet append, or records `not_configured` when the user has no sheet.
async fn schedule_sync(
    db: &Database,
    queue: &SyncQueue,
    user_id: i64,
    plant: &PlantObservation,
) -> Result<SyncStatus, AppError> {
    let user = auth_service::get_user(db, user_id).await?;
    if !user.has_spreadsheet() {
        return Ok(queue.skip_not_configured(plant.id).await);
    }

    let field_name = match plant.field_id {
        Some(field_id) => Some(field_service::get_field(db, user_id, field_id).await?.name),
        None => None,
    };

    let job = SyncJob {
        plant_id: plant.id,
        spreadsheet_id: user.spreadsheet_id.clone(),
        row: SheetRow::new(&user, field_name.as_deref(), plant),
    };
    Ok(queue.enqueue(job).await)
}

#[utoipa::path(
    post,
    path = "/api/plants",
    tag = "Plants",
    request_body(content = CaptureUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Observation stored", body = CaptureResponse),
        (status = 400, description = "Missing or invalid coordinates, invalid photo"),
        (status = 404, description = "field_id does not belong to the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn capture_plant(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
    queue: web::Data<SyncQueue>,
    config: web::Data<Config>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    log::info!("📸 POST /plants - user {}", user.id);

    let (form, photo) = read_capture_form(payload, config.max_upload_bytes).await?;
    let mut observation = form.into_observation()?;

    let stored = match &photo {
        Some(photo) => {
            let (path, public) = save_photo(&config.upload_dir, photo).await?;
            observation.photo_path = Some(public);
            Some(path)
        }
        None => None,
    };

    let plant = match plant_service::capture(&db, user.id, &observation).await {
        Ok(plant) => plant,
        Err(e) => {
            if let Some(path) = stored {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    log::warn!("⚠️  Could not remove orphan photo {}: {}", path.display(), rm);
                }
            }
            return Err(e);
        }
    };

    // Falha ao agendar não derruba a captura: o registro já está salvo
    let sync_status = match schedule_sync(&db, &queue, user.id, &plant).await {
        Ok(status) => status,
        Err(e) => {
            log::error!("❌ Could not schedule sheet sync for plant {}: {}", plant.id, e);
            queue.mark_failed(plant.id).await
        }
    };

    log::info!(
        "✅ Plant {} stored at {} (sync: {})",
        plant.id,
        plant.location_id,
        sync_status.as_str()
    );

    Ok(HttpResponse::Ok().json(CaptureResponse {
        id: plant.id,
        location_id: plant.location_id,
        sync_status,
        message: "Plant record created successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/plants",
    tag = "Plants",
    params(PlantQuery),
    responses(
        (status = 200, description = "Caller's observations, newest first", body = Vec<PlantObservation>),
        (status = 400, description = "Invalid radius or coordinates")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_plants(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
    query: web::Query<PlantQuery>,
) -> Result<HttpResponse, AppError> {
    log::debug!("🌱 GET /plants - user {} {:?}", user.id, query);

    let filter = PlantFilter::from_query(&query)?;
    let plants = plant_service::list_plants(&db, user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(plants))
}

#[utoipa::path(
    get,
    path = "/api/plants/locations",
    tag = "Plants",
    responses(
        (status = 200, description = "Visited locations, most recent first", body = Vec<LocationSummary>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_locations(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    log::debug!("📍 GET /plants/locations - user {}", user.id);

    let locations = plant_service::locations(&db, user.id).await?;
    Ok(HttpResponse::Ok().json(locations))
}

#[utoipa::path(
    get,
    path = "/api/plants/location/{location_id}",
    tag = "Plants",
    params(("location_id" = String, Path, description = "Location bucket, e.g. 40.712800_-74.006000")),
    responses(
        (status = 200, description = "Observations in the bucket, newest first", body = Vec<PlantObservation>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn plants_at_location(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let location_id = path.into_inner();
    log::debug!("📍 GET /plants/location/{} - user {}", location_id, user.id);

    let plants = plant_service::plants_at_location(&db, user.id, &location_id).await?;
    Ok(HttpResponse::Ok().json(plants))
}

#[utoipa::path(
    get,
    path = "/api/plants/{id}/sync",
    tag = "Plants",
    params(("id" = i64, Path, description = "Observation id")),
    responses(
        (status = 200, description = "Spreadsheet sync state", body = SyncStatusResponse),
        (status = 404, description = "Not found or not owned by the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn sync_status(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
    queue: web::Data<SyncQueue>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let plant_id = path.into_inner();

    let plant = plant_service::get_plant(&db, user.id, plant_id).await?;
    let status = queue.status(&plant).await;

    Ok(HttpResponse::Ok().json(SyncStatusResponse { plant_id, status }))
}
