use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::students::Student;
use crate::AppState;

pub const SOURCE_MANUAL: &str = "Manual Entry";
pub const SOURCE_BARCODE: &str = "Barcode Scanner";

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub roll_no: String,
    pub date: DateTime<Utc>,
    pub name: Option<String>,
    pub phone_number1: Option<String>,
    pub phone_number2: Option<String>,
    pub class_name: Option<String>,
    pub is_present: bool,
    pub source: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttendanceRequest {
    pub roll_no: String,
    pub is_present: bool,
    pub scanned_data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeScanRequest {
    pub scanned_data: String,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRecordsQuery {
    #[serde(rename = "className")]
    pub class_name: Option<String>,
    pub status: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub year: Option<String>,
}

/// Students of the class with no attendance row in the window,
/// synthesized on the fly rather than read from the store.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AbsentRecord {
    id: i64,
    roll_no: String,
    name: Option<String>,
    phone_number1: Option<String>,
    phone_number2: Option<String>,
    class_name: Option<String>,
    is_present: bool,
}

/// Extract the roll number from scanned barcode payload. The payload is
/// expected to be a JSON object carrying a rollNo key; scanners that
/// emit numeric roll numbers are accepted too.
fn roll_no_from_barcode(scanned_data: &str) -> Option<String> {
    let parsed: serde_json::Value = match serde_json::from_str(scanned_data) {
        Ok(value) => value,
        Err(e) => {
            error!("Error parsing barcode data: {}", e);
            return None;
        }
    };

    match parsed.get("rollNo") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// UTC day window [00:00, next day 00:00). None for invalid dates.
fn day_window(year: i32, month: u32, day: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, day)?
        .and_time(NaiveTime::MIN)
        .and_utc();
    Some((start, start + Duration::days(1)))
}

fn today_window() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

async fn find_student(
    db: &sqlx::SqlitePool,
    roll_no: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE roll_no = ?")
        .bind(roll_no)
        .fetch_optional(db)
        .await
}

async fn insert_attendance(
    db: &sqlx::SqlitePool,
    student: &Student,
    is_present: bool,
    source: &str,
) -> Result<AttendanceRecord, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "INSERT INTO attendance (roll_no, date, name, phone_number1, phone_number2,
                                 class_name, is_present, source)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *"
    )
    .bind(&student.roll_no)
    .bind(Utc::now())
    .bind(&student.name)
    .bind(&student.phone_number1)
    .bind(&student.phone_number2)
    .bind(&student.class_name)
    .bind(is_present)
    .bind(source)
    .fetch_one(db)
    .await
}

#[post("/api/record-attendance")]
async fn record_attendance(
    app_state: web::Data<AppState>,
    payload: web::Json<RecordAttendanceRequest>,
) -> impl Responder {
    let student = match find_student(&app_state.db, &payload.roll_no).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "Student not found for the given Roll No"
            }));
        }
        Err(e) => {
            error!("Database error fetching student: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error recording attendance"
            }));
        }
    };

    // Presence of scanned data marks the entry as scanner-sourced; the
    // payload itself is not parsed on this route.
    let source = if payload.scanned_data.is_some() {
        SOURCE_BARCODE
    } else {
        SOURCE_MANUAL
    };

    match insert_attendance(&app_state.db, &student, payload.is_present, source).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => {
            error!("Database error inserting attendance: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error recording attendance"
            }))
        }
    }
}

#[post("/api/record-attendance/barcode")]
async fn record_attendance_barcode(
    app_state: web::Data<AppState>,
    payload: web::Json<BarcodeScanRequest>,
) -> impl Responder {
    let roll_no = match roll_no_from_barcode(&payload.scanned_data) {
        Some(roll_no) => roll_no,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid barcode data"
            }));
        }
    };

    let student = match find_student(&app_state.db, &roll_no).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "Student not found for the given Roll No"
            }));
        }
        Err(e) => {
            error!("Database error fetching student: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error recording attendance from barcode scan"
            }));
        }
    };

    // A scanned student is present by definition.
    match insert_attendance(&app_state.db, &student, true, SOURCE_BARCODE).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => {
            error!("Database error inserting attendance: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error recording attendance from barcode scan"
            }))
        }
    }
}

#[get("/api/check-attendance/{roll_no}")]
async fn check_attendance(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let roll_no = path.into_inner();

    match find_student(&app_state.db, &roll_no).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "Student not found"
            }));
        }
        Err(e) => {
            error!("Database error fetching student: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error checking existing attendance"
            }));
        }
    }

    let (start, end) = today_window();

    let result = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance
         WHERE roll_no = ? AND datetime(date) >= datetime(?) AND datetime(date) < datetime(?)
         LIMIT 1"
    )
    .bind(&roll_no)
    .bind(start)
    .bind(end)
    .fetch_optional(&app_state.db)
    .await;

    match result {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        // No row today: synthetic body, nothing is written.
        Ok(None) => HttpResponse::Ok().json(serde_json::json!({ "isPresent": false })),
        Err(e) => {
            error!("Database error checking attendance: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error checking existing attendance"
            }))
        }
    }
}

#[get("/api/attendance-records")]
async fn attendance_records(
    app_state: web::Data<AppState>,
    query: web::Query<AttendanceRecordsQuery>,
) -> impl Responder {
    let query = query.into_inner();

    let (class_name, status, month, day, year) = match (
        query.class_name.filter(|s| !s.is_empty()),
        query.status.filter(|s| !s.is_empty()),
        query.month.filter(|s| !s.is_empty()),
        query.day.filter(|s| !s.is_empty()),
        query.year.filter(|s| !s.is_empty()),
    ) {
        (Some(c), Some(s), Some(m), Some(d), Some(y)) => (c, s, m, d, y),
        _ => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid input parameters"
            }));
        }
    };

    let window = match (month.parse::<u32>(), day.parse::<u32>(), year.parse::<i32>()) {
        (Ok(month), Ok(day), Ok(year)) => day_window(year, month, day),
        _ => None,
    };

    let (start, end) = match window {
        Some(window) => window,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid input parameters"
            }));
        }
    };

    match status.as_str() {
        "true" => {
            let result = sqlx::query_as::<_, AttendanceRecord>(
                "SELECT * FROM attendance
                 WHERE class_name = ? AND is_present = 1
                   AND datetime(date) >= datetime(?) AND datetime(date) < datetime(?)"
            )
            .bind(&class_name)
            .bind(start)
            .bind(end)
            .fetch_all(&app_state.db)
            .await;

            match result {
                Ok(records) => HttpResponse::Ok().json(records),
                Err(e) => {
                    error!("Error fetching attendance records: {}", e);
                    HttpResponse::InternalServerError().json(serde_json::json!({
                        "error": "Error fetching attendance records"
                    }))
                }
            }
        }
        "false" => {
            // Set difference: class members minus roll numbers with any
            // attendance row in the window.
            let result = sqlx::query_as::<_, Student>(
                "SELECT * FROM students
                 WHERE class_name = ? AND roll_no NOT IN (
                     SELECT roll_no FROM attendance
                     WHERE class_name = ?
                       AND datetime(date) >= datetime(?) AND datetime(date) < datetime(?)
                 )"
            )
            .bind(&class_name)
            .bind(&class_name)
            .bind(start)
            .bind(end)
            .fetch_all(&app_state.db)
            .await;

            match result {
                Ok(students) => {
                    let records: Vec<AbsentRecord> = students
                        .into_iter()
                        .map(|student| AbsentRecord {
                            id: student.id,
                            roll_no: student.roll_no,
                            name: student.name,
                            phone_number1: student.phone_number1,
                            phone_number2: student.phone_number2,
                            class_name: student.class_name,
                            is_present: false,
                        })
                        .collect();
                    HttpResponse::Ok().json(records)
                }
                Err(e) => {
                    error!("Error fetching attendance records: {}", e);
                    HttpResponse::InternalServerError().json(serde_json::json!({
                        "error": "Error fetching attendance records"
                    }))
                }
            }
        }
        _ => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Invalid status parameter"
        })),
    }
}

#[get("/api/latest-attendances")]
async fn latest_attendances(app_state: web::Data<AppState>) -> impl Responder {
    let result = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance
         ORDER BY datetime(date) DESC, id DESC
         LIMIT 5"
    )
    .fetch_all(&app_state.db)
    .await;

    match result {
        Ok(records) => HttpResponse::Ok().json(serde_json::json!({ "attendances": records })),
        Err(e) => {
            error!("Error fetching latest attendances: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error fetching latest attendances"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(record_attendance);
    cfg.service(record_attendance_barcode);
    cfg.service(check_attendance);
    cfg.service(attendance_records);
    cfg.service(latest_attendances);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barcode_roll_no_string() {
        let scanned = r#"{"rollNo": "42", "name": "Ali"}"#;
        assert_eq!(roll_no_from_barcode(scanned), Some("42".to_string()));
    }

    #[test]
    fn test_barcode_roll_no_numeric() {
        let scanned = r#"{"rollNo": 42}"#;
        assert_eq!(roll_no_from_barcode(scanned), Some("42".to_string()));
    }

    #[test]
    fn test_barcode_malformed_json() {
        assert_eq!(roll_no_from_barcode("not-json"), None);
    }

    #[test]
    fn test_barcode_missing_roll_no() {
        assert_eq!(roll_no_from_barcode(r#"{"name": "Ali"}"#), None);
    }

    #[test]
    fn test_day_window_spans_one_day() {
        let (start, end) = day_window(2024, 1, 15).unwrap();
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(start.to_rfc3339(), "2024-01-15T00:00:00+00:00");
    }

    #[test]
    fn test_day_window_invalid_date() {
        assert!(day_window(2024, 2, 30).is_none());
        assert!(day_window(2024, 13, 1).is_none());
    }
}
