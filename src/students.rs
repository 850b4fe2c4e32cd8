use actix_web::{get, post, put, web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub roll_no: String,
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub cnic: Option<String>,
    pub address: Option<String>,
    pub phone_number1: Option<String>,
    pub phone_number2: Option<String>,
    pub class_name: Option<String>,
    pub category: Option<String>,
    pub student_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub roll_no: String,
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub cnic: Option<String>,
    pub address: Option<String>,
    pub phone_number1: Option<String>,
    pub phone_number2: Option<String>,
    pub class_name: Option<String>,
    pub category: Option<String>,
    pub student_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub cnic: Option<String>,
    pub address: Option<String>,
    pub phone_number1: Option<String>,
    pub phone_number2: Option<String>,
    pub class_name: Option<String>,
    pub category: Option<String>,
    pub student_pic: Option<String>,
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[post("/api/enroll")]
async fn enroll(
    app_state: web::Data<AppState>,
    payload: web::Json<NewStudent>,
) -> impl Responder {
    // Pre-check gives the friendly message; the UNIQUE index on roll_no
    // is the authoritative guard under concurrent requests.
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM students WHERE roll_no = ?")
        .bind(&payload.roll_no)
        .fetch_optional(&app_state.db)
        .await;

    match existing {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Student with Roll No {} already exists", payload.roll_no)
            }));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Database error checking roll number: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error enrolling student"
            }));
        }
    }

    let insert_result = sqlx::query_as::<_, Student>(
        "INSERT INTO students (roll_no, name, father_name, cnic, address,
                               phone_number1, phone_number2, class_name, category, student_pic)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *"
    )
    .bind(&payload.roll_no)
    .bind(&payload.name)
    .bind(&payload.father_name)
    .bind(&payload.cnic)
    .bind(&payload.address)
    .bind(&payload.phone_number1)
    .bind(&payload.phone_number2)
    .bind(&payload.class_name)
    .bind(&payload.category)
    .bind(&payload.student_pic)
    .fetch_one(&app_state.db)
    .await;

    match insert_result {
        Ok(student) => HttpResponse::Ok().json(student),
        Err(e) if is_unique_violation(&e) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Student with Roll No {} already exists", payload.roll_no)
            }))
        }
        Err(e) => {
            error!("Database error enrolling student: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error enrolling student"
            }))
        }
    }
}

#[put("/api/update-student/{roll_no}")]
async fn update_student(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateStudentRequest>,
) -> impl Responder {
    let roll_no = path.into_inner();

    let existing = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE roll_no = ?")
        .bind(&roll_no)
        .fetch_optional(&app_state.db)
        .await;

    let mut student = match existing {
        Ok(Some(student)) => student,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "Student not found"
            }));
        }
        Err(e) => {
            error!("Database error fetching student: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error updating student record"
            }));
        }
    };

    // Merge the provided fields over the stored record; roll_no itself
    // is the lookup key and is not remappable.
    let payload = payload.into_inner();
    if let Some(name) = payload.name {
        student.name = Some(name);
    }
    if let Some(father_name) = payload.father_name {
        student.father_name = Some(father_name);
    }
    if let Some(cnic) = payload.cnic {
        student.cnic = Some(cnic);
    }
    if let Some(address) = payload.address {
        student.address = Some(address);
    }
    if let Some(phone_number1) = payload.phone_number1 {
        student.phone_number1 = Some(phone_number1);
    }
    if let Some(phone_number2) = payload.phone_number2 {
        student.phone_number2 = Some(phone_number2);
    }
    if let Some(class_name) = payload.class_name {
        student.class_name = Some(class_name);
    }
    if let Some(category) = payload.category {
        student.category = Some(category);
    }
    if let Some(student_pic) = payload.student_pic {
        student.student_pic = Some(student_pic);
    }

    let update_result = sqlx::query(
        "UPDATE students
         SET name = ?, father_name = ?, cnic = ?, address = ?,
             phone_number1 = ?, phone_number2 = ?, class_name = ?,
             category = ?, student_pic = ?
         WHERE roll_no = ?"
    )
    .bind(&student.name)
    .bind(&student.father_name)
    .bind(&student.cnic)
    .bind(&student.address)
    .bind(&student.phone_number1)
    .bind(&student.phone_number2)
    .bind(&student.class_name)
    .bind(&student.category)
    .bind(&student.student_pic)
    .bind(&roll_no)
    .execute(&app_state.db)
    .await;

    match update_result {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "student": student })),
        Err(e) => {
            error!("Database error updating student: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error updating student record"
            }))
        }
    }
}

#[get("/api/student-info/{roll_no}")]
async fn student_info(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let roll_no = path.into_inner();

    let result = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE roll_no = ?")
        .bind(&roll_no)
        .fetch_optional(&app_state.db)
        .await;

    match result {
        Ok(Some(student)) => HttpResponse::Ok().json(serde_json::json!({ "student": student })),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Student not found"
        })),
        Err(e) => {
            error!("Database error fetching student: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error fetching record"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(enroll);
    cfg.service(update_student);
    cfg.service(student_info);
}
