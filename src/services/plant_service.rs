use crate::{
    database::Database,
    models::{LocationSummary, NewObservation, PlantObservation, PlantQuery},
    services::field_service,
    utils::{
        error::AppError,
        geo::{location_id, BoundingBox, DEFAULT_RADIUS_METERS},
    },
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

const PLANT_COLUMNS: &str = "id, user_id, field_id, location_id, latitude, longitude, timestamp, \
     photo_path, notes, plant_type, growth_stage, height_cm, health_score, synced_to_sheets";

/// Raw text parts of a capture upload, before validation.
#[derive(Debug, Default)]
pub struct CaptureForm {
    pub fields: HashMap<String, String>,
    pub photo_path: Option<String>,
}

impl CaptureForm {
    /// Non-empty, trimmed value of a text part.
    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, AppError> {
        match self.text(name) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::validation(format!("Invalid {}: '{}'", name, raw))),
            None => Ok(None),
        }
    }

    pub fn into_observation(self) -> Result<NewObservation, AppError> {
        let (latitude, longitude) = match (self.parse::<f64>("latitude")?, self.parse::<f64>("longitude")?) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(AppError::validation("Location (latitude, longitude) required")),
        };

        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::validation("Latitude must be between -90 and 90"));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::validation("Longitude must be between -180 and 180"));
        }

        let height_cm = self.parse::<f64>("height_cm")?;
        if let Some(h) = height_cm {
            if !h.is_finite() || h < 0.0 {
                return Err(AppError::validation("Height must be a non-negative number"));
            }
        }

        let health_score = self.parse::<i64>("health_score")?;
        if let Some(score) = health_score {
            if !(0..=100).contains(&score) {
                return Err(AppError::validation("Health score must be between 0 and 100"));
            }
        }

        Ok(NewObservation {
            latitude,
            longitude,
            field_id: self.parse::<i64>("field_id")?,
            notes: self.text("notes").unwrap_or("").to_string(),
            plant_type: self.text("plant_type").unwrap_or("").to_string(),
            growth_stage: self.text("growth_stage").unwrap_or("").to_string(),
            height_cm,
            health_score,
            photo_path: self.photo_path,
        })
    }
}

/// Filters for listing observations; the owner filter is added separately and always applies.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PlantFilter {
    pub field_id: Option<i64>,
    pub bbox: Option<BoundingBox>,
}

impl PlantFilter {
    pub fn from_query(query: &PlantQuery) -> Result<Self, AppError> {
        let bbox = match (query.latitude, query.longitude) {
            (Some(lat), Some(lon)) => {
                let radius = query.radius.unwrap_or(DEFAULT_RADIUS_METERS);
                if !radius.is_finite() || radius < 0.0 {
                    return Err(AppError::validation("Radius must be a non-negative number of meters"));
                }
                if !lat.is_finite() || !lon.is_finite() {
                    return Err(AppError::validation("Invalid center coordinates"));
                }
                Some(BoundingBox::around(lat, lon, radius))
            }
            _ => None,
        };

        Ok(Self {
            field_id: query.field_id,
            bbox,
        })
    }
}

/// Stores one observation for `user_id`. A `field_id` must belong to the same user.
pub async fn capture(
    db: &Database,
    user_id: i64,
    observation: &NewObservation,
) -> Result<PlantObservation, AppError> {
    if let Some(field_id) = observation.field_id {
        field_service::get_field(db, user_id, field_id).await?;
    }

    let location = location_id(observation.latitude, observation.longitude);

    let plant = sqlx::query_as::<_, PlantObservation>(&format!(
        "INSERT INTO plants (
            user_id, field_id, location_id, latitude, longitude, timestamp, photo_path,
            notes, plant_type, growth_stage, height_cm, health_score
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING {}",
        PLANT_COLUMNS
    ))
    .bind(user_id)
    .bind(observation.field_id)
    .bind(&location)
    .bind(observation.latitude)
    .bind(observation.longitude)
    .bind(Utc::now())
    .bind(&observation.photo_path)
    .bind(&observation.notes)
    .bind(&observation.plant_type)
    .bind(&observation.growth_stage)
    .bind(observation.height_cm)
    .bind(observation.health_score)
    .fetch_one(db.pool())
    .await?;

    Ok(plant)
}

/// Observations of `user_id` matching `filter`, newest first.
pub async fn list_plants(
    db: &Database,
    user_id: i64,
    filter: &PlantFilter,
) -> Result<Vec<PlantObservation>, AppError> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM plants WHERE user_id = ", PLANT_COLUMNS));
    query.push_bind(user_id);

    if let Some(field_id) = filter.field_id {
        query.push(" AND field_id = ").push_bind(field_id);
    }

    if let Some(bbox) = filter.bbox {
        query
            .push(" AND latitude BETWEEN ")
            .push_bind(bbox.min_lat)
            .push(" AND ")
            .push_bind(bbox.max_lat)
            .push(" AND longitude BETWEEN ")
            .push_bind(bbox.min_lon)
            .push(" AND ")
            .push_bind(bbox.max_lon);
    }

    query.push(" ORDER BY timestamp DESC, id DESC");

    let plants = query
        .build_query_as::<PlantObservation>()
        .fetch_all(db.pool())
        .await?;

    Ok(plants)
}

pub async fn plants_at_location(
    db: &Database,
    user_id: i64,
    location: &str,
) -> Result<Vec<PlantObservation>, AppError> {
    let plants = sqlx::query_as::<_, PlantObservation>(&format!(
        "SELECT {} FROM plants WHERE user_id = ? AND location_id = ?
         ORDER BY timestamp DESC, id DESC",
        PLANT_COLUMNS
    ))
    .bind(user_id)
    .bind(location)
    .fetch_all(db.pool())
    .await?;

    Ok(plants)
}

/// One row per visited bucket, most recently visited first.
///
/// Coordinates come from the latest visit of each bucket (SQLite picks bare
/// columns from the row that produced `MAX(...)`).
pub async fn locations(db: &Database, user_id: i64) -> Result<Vec<LocationSummary>, AppError> {
    let rows = sqlx::query_as::<_, LocationSummary>(
        "SELECT location_id, latitude, longitude,
                COUNT(*) AS photo_count,
                MAX(timestamp) AS last_visit
         FROM plants
         WHERE user_id = ?
         GROUP BY location_id
         ORDER BY last_visit DESC",
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;

    Ok(rows)
}

pub async fn get_plant(
    db: &Database,
    user_id: i64,
    plant_id: i64,
) -> Result<PlantObservation, AppError> {
    sqlx::query_as::<_, PlantObservation>(&format!(
        "SELECT {} FROM plants WHERE id = ? AND user_id = ?",
        PLANT_COLUMNS
    ))
    .bind(plant_id)
    .bind(user_id)
    .fetch_optional(db.pool())
    .await?
    .ok_or_else(|| AppError::not_found("Plant record not found"))
}

/// Sets the sync flag after a confirmed sheet append. Nada mais muda após a captura.
pub async fn mark_synced(db: &Database, plant_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE plants SET synced_to_sheets = 1 WHERE id = ?")
        .bind(plant_id)
        .execute(db.pool())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateFieldRequest;
    use crate::test_support::{seed_user, test_db};

    fn form(pairs: &[(&str, &str)]) -> CaptureForm {
        CaptureForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            photo_path: None,
        }
    }

    fn at(lat: f64, lon: f64) -> NewObservation {
        NewObservation {
            latitude: lat,
            longitude: lon,
            ..Default::default()
        }
    }

    #[test]
    fn test_form_requires_coordinates() {
        let missing = form(&[("latitude", "40.7128")]).into_observation();
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let empty = form(&[("latitude", ""), ("longitude", "-74.006")]).into_observation();
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_form_rejects_bad_numbers() {
        assert!(form(&[("latitude", "north"), ("longitude", "1")]).into_observation().is_err());
        assert!(form(&[("latitude", "91"), ("longitude", "1")]).into_observation().is_err());
        assert!(form(&[("latitude", "1"), ("longitude", "NaN")]).into_observation().is_err());
        assert!(form(&[("latitude", "1"), ("longitude", "1"), ("health_score", "101")])
            .into_observation()
            .is_err());
        assert!(form(&[("latitude", "1"), ("longitude", "1"), ("height_cm", "-3")])
            .into_observation()
            .is_err());
    }

    #[test]
    fn test_form_empty_optionals_are_absent() {
        let obs = form(&[
            ("latitude", "0"),
            ("longitude", "0"),
            ("height_cm", ""),
            ("health_score", ""),
            ("field_id", ""),
            ("plant_type", " Tomato "),
        ])
        .into_observation()
        .unwrap();

        assert_eq!(obs.latitude, 0.0);
        assert_eq!(obs.height_cm, None);
        assert_eq!(obs.health_score, None);
        assert_eq!(obs.field_id, None);
        assert_eq!(obs.plant_type, "Tomato");
    }

    #[test]
    fn test_filter_needs_both_coordinates() {
        let only_lat = PlantFilter::from_query(&PlantQuery {
            latitude: Some(1.0),
            ..Default::default()
        })
        .unwrap();
        assert!(only_lat.bbox.is_none());

        let both = PlantFilter::from_query(&PlantQuery {
            latitude: Some(1.0),
            longitude: Some(2.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(both.bbox, Some(BoundingBox::around(1.0, 2.0, DEFAULT_RADIUS_METERS)));

        let negative = PlantFilter::from_query(&PlantQuery {
            latitude: Some(1.0),
            longitude: Some(2.0),
            radius: Some(-5.0),
            ..Default::default()
        });
        assert!(negative.is_err());
    }

    #[tokio::test]
    async fn test_capture_derives_location_id() {
        let (_dir, db) = test_db().await;
        let owner = seed_user(&db, "ana").await;

        let plant = capture(&db, owner.id, &at(40.7128, -74.006)).await.unwrap();

        assert_eq!(plant.user_id, owner.id);
        assert_eq!(plant.location_id, "40.712800_-74.006000");
        assert!(!plant.synced_to_sheets);
    }

    #[tokio::test]
    async fn test_capture_rejects_foreign_field() {
        let (_dir, db) = test_db().await;
        let ana = seed_user(&db, "ana").await;
        let bruno = seed_user(&db, "bruno").await;
        let field_id = field_service::create_field(
            &db,
            ana.id,
            &CreateFieldRequest {
                name: Some("North".into()),
                size_acres: None,
                crop_type: None,
            },
        )
        .await
        .unwrap();

        let mut obs = at(1.0, 1.0);
        obs.field_id = Some(field_id);

        assert!(matches!(capture(&db, bruno.id, &obs).await, Err(AppError::NotFound(_))));
        assert_eq!(capture(&db, ana.id, &obs).await.unwrap().field_id, Some(field_id));
    }

    #[tokio::test]
    async fn test_proximity_filter_box() {
        let (_dir, db) = test_db().await;
        let owner = seed_user(&db, "ana").await;

        // raio de 111m -> delta de 0.001 grau
        let inside = capture(&db, owner.id, &at(10.0005, 20.0005)).await.unwrap();
        let corner = capture(&db, owner.id, &at(10.00099, 20.00099)).await.unwrap();
        capture(&db, owner.id, &at(10.0011, 20.0)).await.unwrap();
        capture(&db, owner.id, &at(10.0, 19.998)).await.unwrap();

        let filter = PlantFilter::from_query(&PlantQuery {
            latitude: Some(10.0),
            longitude: Some(20.0),
            radius: Some(111.0),
            field_id: None,
        })
        .unwrap();
        let found = list_plants(&db, owner.id, &filter).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|p| p.id).collect();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&inside.id));
        assert!(ids.contains(&corner.id));
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped_and_newest_first() {
        let (_dir, db) = test_db().await;
        let ana = seed_user(&db, "ana").await;
        let bruno = seed_user(&db, "bruno").await;

        let first = capture(&db, ana.id, &at(1.0, 1.0)).await.unwrap();
        let second = capture(&db, ana.id, &at(1.0, 1.0)).await.unwrap();
        capture(&db, bruno.id, &at(1.0, 1.0)).await.unwrap();

        let listed = list_plants(&db, ana.id, &PlantFilter::default()).await.unwrap();
        assert_eq!(listed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert!(listed.iter().all(|p| p.user_id == ana.id));

        assert!(matches!(
            get_plant(&db, bruno.id, first.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_locations_aggregate() {
        let (_dir, db) = test_db().await;
        let owner = seed_user(&db, "ana").await;

        capture(&db, owner.id, &at(40.7128, -74.006)).await.unwrap();
        capture(&db, owner.id, &at(1.5, 1.5)).await.unwrap();
        capture(&db, owner.id, &at(40.712800, -74.006000)).await.unwrap();

        let buckets = locations(&db, owner.id).await.unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].location_id, "40.712800_-74.006000");
        assert_eq!(buckets[0].photo_count, 2);
        assert_eq!(buckets[1].location_id, "1.500000_1.500000");
        assert_eq!(buckets[1].photo_count, 1);

        let at_spot = plants_at_location(&db, owner.id, "40.712800_-74.006000").await.unwrap();
        assert_eq!(at_spot.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_synced() {
        let (_dir, db) = test_db().await;
        let owner = seed_user(&db, "ana").await;
        let plant = capture(&db, owner.id, &at(1.0, 1.0)).await.unwrap();

        mark_synced(&db, plant.id).await.unwrap();

        assert!(get_plant(&db, owner.id, plant.id).await.unwrap().synced_to_sheets);
    }
}
