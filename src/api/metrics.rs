use actix_web::{web, HttpResponse};

use crate::jobs::sheet_sync::{SyncQueue, SyncSnapshot};

fn render(snapshot: &SyncSnapshot) -> String {
    format!(
        "# HELP sheet_sync_enqueued_total Observations queued for spreadsheet sync\n\
         # TYPE sheet_sync_enqueued_total counter\n\
         sheet_sync_enqueued_total {}\n\
         \n\
         # HELP sheet_sync_synced_total Observations appended to a spreadsheet\n\
         # TYPE sheet_sync_synced_total counter\n\
         sheet_sync_synced_total {}\n\
         \n\
         # HELP sheet_sync_failed_total Spreadsheet appends that failed\n\
         # TYPE sheet_sync_failed_total counter\n\
         sheet_sync_failed_total {}\n\
         \n\
         # HELP sheet_sync_not_configured_total Captures by users without a linked spreadsheet\n\
         # TYPE sheet_sync_not_configured_total counter\n\
         sheet_sync_not_configured_total {}\n",
        snapshot.enqueued, snapshot.synced, snapshot.failed, snapshot.not_configured
    )
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Sync job counters in Prometheus text format", body = String)
    )
)]
pub async fn get_metrics(queue: web::Data<SyncQueue>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render(&queue.snapshot()))
}
