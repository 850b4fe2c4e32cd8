use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::{Datelike, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::students::is_unique_violation;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    pub id: i64,
    pub roll_no: String,
    pub month: String,
    pub year: i64,
    pub amount: i64,
    pub is_paid: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFeeRequest {
    pub roll_no: String,
    pub month: String,
    pub year: i64,
    pub amount: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidFee {
    pub roll_no: String,
    pub name: Option<String>,
    pub class_name: Option<String>,
}

#[post("/api/record-fee")]
async fn record_fee(
    app_state: web::Data<AppState>,
    payload: web::Json<RecordFeeRequest>,
) -> impl Responder {
    let student_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM students WHERE roll_no = ?")
        .bind(&payload.roll_no)
        .fetch_optional(&app_state.db)
        .await;

    match student_exists {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "Student not found"
            }));
        }
        Err(e) => {
            error!("Database error checking student: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error recording fee"
            }));
        }
    }

    // A prior unpaid record does not block recording; only a paid one does.
    let already_paid = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM fee_records
         WHERE roll_no = ? AND month = ? AND year = ? AND is_paid = 1"
    )
    .bind(&payload.roll_no)
    .bind(&payload.month)
    .bind(payload.year)
    .fetch_optional(&app_state.db)
    .await;

    match already_paid {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Fee is already paid for the selected month and year"
            }));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Database error checking fee record: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error recording fee"
            }));
        }
    }

    let insert_result = sqlx::query_as::<_, FeeRecord>(
        "INSERT INTO fee_records (roll_no, month, year, amount, is_paid)
         VALUES (?, ?, ?, ?, 1)
         RETURNING *"
    )
    .bind(&payload.roll_no)
    .bind(&payload.month)
    .bind(payload.year)
    .bind(payload.amount)
    .fetch_one(&app_state.db)
    .await;

    match insert_result {
        Ok(record) => HttpResponse::Ok().json(record),
        // The partial unique index catches the race between the paid
        // check and the insert.
        Err(e) if is_unique_violation(&e) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Fee is already paid for the selected month and year"
            }))
        }
        Err(e) => {
            error!("Database error inserting fee record: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error recording fee"
            }))
        }
    }
}

/// Students with no paid fee record for the current month and year.
#[get("/api/unpaid-fees")]
async fn unpaid_fees(app_state: web::Data<AppState>) -> impl Responder {
    let now = Utc::now();
    let current_month = now.format("%B").to_string();
    let current_year = now.year() as i64;

    let result = sqlx::query_as::<_, UnpaidFee>(
        "SELECT s.roll_no, s.name, s.class_name FROM students s
         WHERE NOT EXISTS (
             SELECT 1 FROM fee_records f
             WHERE f.roll_no = s.roll_no AND f.month = ? AND f.year = ? AND f.is_paid = 1
         )"
    )
    .bind(&current_month)
    .bind(current_year)
    .fetch_all(&app_state.db)
    .await;

    match result {
        Ok(unpaid) => HttpResponse::Ok().json(unpaid),
        Err(e) => {
            error!("Database error fetching unpaid fees: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error fetching unpaid fees"
            }))
        }
    }
}

#[get("/api/fee-records/{identifier}")]
async fn fee_records(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let roll_no = path.into_inner();

    let result = sqlx::query_as::<_, FeeRecord>("SELECT * FROM fee_records WHERE roll_no = ?")
        .bind(&roll_no)
        .fetch_all(&app_state.db)
        .await;

    match result {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            error!("Database error fetching fee records: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error fetching fee records"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(record_fee);
    cfg.service(unpaid_fees);
    cfg.service(fee_records);
}
