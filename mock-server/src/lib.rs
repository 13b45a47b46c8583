//! In-memory implementation of the tutoring marketplace backend.
//!
//! Serves the same wire contract the client speaks: JSON bodies, bearer
//! tokens, `{ "error": "..." }` on failure and raw bytes for avatars. All
//! state lives behind one `RwLock` and is lost on restart.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    pub birthdate: NaiveDate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub birthdate: NaiveDate,
    pub avatar: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeacherSkill {
    pub skill_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub about: String,
    pub video_card_link: Option<String>,
    pub rate: f64,
}

#[derive(Deserialize)]
pub struct NewSkill {
    pub category_id: i64,
    pub video_card_link: Option<String>,
    pub about: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub teacher_id: i64,
    pub user_id: i64,
    pub name: String,
    pub surname: String,
    pub avatar: Option<String>,
    pub finished_lessons: u32,
    pub skills: Vec<TeacherSkill>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub schedule_time_id: i64,
    pub datetime: DateTime<Utc>,
    pub is_available: bool,
}

#[derive(Deserialize)]
pub struct NewScheduleSlot {
    pub datetime: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct LessonRequest {
    pub teacher_id: i64,
    pub category_id: i64,
    pub schedule_time_id: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Requested,
    Finished,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LessonConfirmation {
    pub lesson_id: i64,
    pub teacher_id: i64,
    pub category_id: i64,
    pub schedule_time_id: i64,
    pub status: LessonStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub student_name: String,
    pub student_surname: String,
    pub student_avatar: Option<String>,
    pub rate: f64,
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

struct User {
    user_id: i64,
    password: String,
    profile: UserProfile,
}

struct Teacher {
    teacher_id: i64,
    user_id: i64,
    finished_lessons: u32,
    skills: Vec<TeacherSkill>,
}

struct Slot {
    teacher_id: i64,
    slot: ScheduleSlot,
}

struct Lesson {
    student_user_id: i64,
    confirmation: LessonConfirmation,
}

struct StoredAvatar {
    content_type: String,
    bytes: Vec<u8>,
}

/// Everything the backend knows. Ids are assigned sequentially from 1.
#[derive(Default)]
pub struct Store {
    users: Vec<User>,
    sessions: HashMap<String, i64>,
    categories: Vec<Category>,
    teachers: Vec<Teacher>,
    slots: Vec<Slot>,
    lessons: Vec<Lesson>,
    reviews: Vec<(i64, Review)>,
    avatars: HashMap<String, StoredAvatar>,
    next_skill_id: i64,
}

/// Login of the seeded teacher.
pub const SEED_TEACHER_EMAIL: &str = "marie@tutor.test";
pub const SEED_TEACHER_PASSWORD: &str = "radium";
pub const SEED_AVATAR_ID: &str = "marie";
/// First bytes of a PNG file, served as the seeded avatar.
pub const SEED_AVATAR_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

impl Store {
    /// Reference categories plus one teacher (id 1) with a physics skill,
    /// three slots (slot 2 already booked), one review and an avatar.
    pub fn seeded() -> Self {
        let mut store = Store {
            categories: vec![
                Category { id: 1, name: "math".to_string() },
                Category { id: 2, name: "physics".to_string() },
                Category { id: 3, name: "english".to_string() },
            ],
            next_skill_id: 1,
            ..Default::default()
        };

        store.avatars.insert(
            SEED_AVATAR_ID.to_string(),
            StoredAvatar {
                content_type: "image/png".to_string(),
                bytes: SEED_AVATAR_BYTES.to_vec(),
            },
        );
        let user_id = store.insert_user(
            SEED_TEACHER_PASSWORD.to_string(),
            UserProfile {
                email: SEED_TEACHER_EMAIL.to_string(),
                name: "Marie".to_string(),
                surname: "Curie".to_string(),
                birthdate: NaiveDate::from_ymd_opt(1967, 11, 7).unwrap_or(NaiveDate::MIN),
                avatar: Some(SEED_AVATAR_ID.to_string()),
            },
        );
        let skill_id = store.take_skill_id();
        store.teachers.push(Teacher {
            teacher_id: 1,
            user_id,
            finished_lessons: 1,
            skills: vec![TeacherSkill {
                skill_id,
                category_id: 2,
                category_name: "physics".to_string(),
                about: "Radioactivity from first principles".to_string(),
                video_card_link: Some("https://video.tutor.test/marie".to_string()),
                rate: 4.8,
            }],
        });
        for (hour, is_available) in [(9, true), (11, false), (14, true)] {
            if let Some(datetime) = Utc.with_ymd_and_hms(2030, 1, 15, hour, 0, 0).single() {
                store.insert_slot(1, datetime, is_available);
            }
        }
        store.reviews.push((
            1,
            Review {
                student_name: "Pierre".to_string(),
                student_surname: "Dupont".to_string(),
                student_avatar: None,
                rate: 4.8,
                comment: "Clear and patient".to_string(),
            },
        ));
        store
    }

    fn insert_user(&mut self, password: String, profile: UserProfile) -> i64 {
        let user_id = self.users.len() as i64 + 1;
        self.users.push(User {
            user_id,
            password,
            profile,
        });
        user_id
    }

    fn insert_slot(&mut self, teacher_id: i64, datetime: DateTime<Utc>, is_available: bool) -> ScheduleSlot {
        let slot = ScheduleSlot {
            schedule_time_id: self.slots.len() as i64 + 1,
            datetime,
            is_available,
        };
        self.slots.push(Slot {
            teacher_id,
            slot: slot.clone(),
        });
        slot
    }

    fn take_skill_id(&mut self) -> i64 {
        let id = self.next_skill_id.max(1);
        self.next_skill_id = id + 1;
        id
    }

    fn open_session(&mut self, user_id: i64) -> AuthResponse {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), user_id);
        AuthResponse { token }
    }

    fn user(&self, user_id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    fn teacher_profile(&self, teacher: &Teacher) -> Option<TeacherProfile> {
        let user = self.user(teacher.user_id)?;
        Some(TeacherProfile {
            teacher_id: teacher.teacher_id,
            user_id: teacher.user_id,
            name: user.profile.name.clone(),
            surname: user.profile.surname.clone(),
            avatar: user.profile.avatar.clone(),
            finished_lessons: teacher.finished_lessons,
            skills: teacher.skills.clone(),
        })
    }
}

pub type Db = Arc<RwLock<Store>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure rendered as `{ "error": message }` with the given status.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        tracing::debug!(status = self.status.as_u16(), message = %self.message, "rejecting request");
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

/// User id behind the bearer token.
fn caller(store: &Store, headers: &HeaderMap) -> ApiResult<i64> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| store.sessions.get(token).copied())
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "missing or invalid token"))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    app_with_store(Store::seeded())
}

pub fn app_with_store(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(sign_up))
        .route("/users/me", get(get_profile).patch(update_profile))
        .route("/categories", get(list_categories))
        .route("/teachers/me/skills", post(add_skill))
        .route("/teachers/me/times", post(add_time))
        .route("/teachers/{id}", get(get_teacher))
        .route("/teachers/{id}/times", get(list_times))
        .route("/teachers/{id}/reviews", get(list_reviews))
        .route("/lessons", post(request_lesson))
        .route("/lessons/{id}/finish", post(finish_lesson))
        .route("/avatars/{id}", get(get_avatar))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> ApiResult<Json<AuthResponse>> {
    let mut store = db.write().await;
    let user_id = store
        .users
        .iter()
        .find(|u| u.profile.email == input.email && u.password == input.password)
        .map(|u| u.user_id)
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "invalid email or password"))?;
    Ok(Json(store.open_session(user_id)))
}

async fn sign_up(
    State(db): State<Db>,
    Json(input): Json<SignUp>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "email and password are required",
        ));
    }
    let mut store = db.write().await;
    if store.users.iter().any(|u| u.profile.email == input.email) {
        return Err(ApiFailure::new(StatusCode::CONFLICT, "email already registered"));
    }
    let user_id = store.insert_user(
        input.password,
        UserProfile {
            email: input.email,
            name: input.name,
            surname: input.surname,
            birthdate: input.birthdate,
            avatar: None,
        },
    );
    Ok((StatusCode::CREATED, Json(store.open_session(user_id))))
}

async fn get_profile(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<UserProfile>> {
    let store = db.read().await;
    let user_id = caller(&store, &headers)?;
    store
        .user(user_id)
        .map(|u| Json(u.profile.clone()))
        .ok_or_else(|| ApiFailure::not_found("profile"))
}

async fn update_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<Json<UserProfile>> {
    let mut store = db.write().await;
    let user_id = caller(&store, &headers)?;

    if let Some(email) = &patch.email {
        if store
            .users
            .iter()
            .any(|u| u.user_id != user_id && &u.profile.email == email)
        {
            return Err(ApiFailure::new(StatusCode::CONFLICT, "email already registered"));
        }
    }

    let avatar = match patch.avatar {
        None => None,
        Some(id) if store.avatars.contains_key(&id) => Some(id),
        Some(encoded) => {
            let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|_| {
                ApiFailure::new(
                    StatusCode::BAD_REQUEST,
                    "avatar must be an avatar id or a base64 image",
                )
            })?;
            let id = Uuid::new_v4().simple().to_string();
            store.avatars.insert(
                id.clone(),
                StoredAvatar {
                    content_type: "image/png".to_string(),
                    bytes,
                },
            );
            Some(id)
        }
    };

    let user = store
        .users
        .iter_mut()
        .find(|u| u.user_id == user_id)
        .ok_or_else(|| ApiFailure::not_found("profile"))?;
    let profile = &mut user.profile;
    if let Some(email) = patch.email {
        profile.email = email;
    }
    if let Some(name) = patch.name {
        profile.name = name;
    }
    if let Some(surname) = patch.surname {
        profile.surname = surname;
    }
    if let Some(birthdate) = patch.birthdate {
        profile.birthdate = birthdate;
    }
    if avatar.is_some() {
        profile.avatar = avatar;
    }
    Ok(Json(profile.clone()))
}

async fn list_categories(State(db): State<Db>) -> Json<Vec<Category>> {
    Json(db.read().await.categories.clone())
}

async fn add_skill(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewSkill>,
) -> ApiResult<(StatusCode, Json<TeacherSkill>)> {
    let mut store = db.write().await;
    let user_id = caller(&store, &headers)?;
    let category_name = store
        .categories
        .iter()
        .find(|c| c.id == input.category_id)
        .map(|c| c.name.clone())
        .ok_or_else(|| ApiFailure::new(StatusCode::BAD_REQUEST, "unknown category"))?;

    if !store.teachers.iter().any(|t| t.user_id == user_id) {
        let teacher_id = store.teachers.len() as i64 + 1;
        store.teachers.push(Teacher {
            teacher_id,
            user_id,
            finished_lessons: 0,
            skills: Vec::new(),
        });
    }
    let skill_id = store.take_skill_id();
    let teacher = store
        .teachers
        .iter_mut()
        .find(|t| t.user_id == user_id)
        .ok_or_else(|| ApiFailure::not_found("teacher"))?;
    if teacher.skills.iter().any(|s| s.category_id == input.category_id) {
        return Err(ApiFailure::new(
            StatusCode::CONFLICT,
            "skill already registered for this category",
        ));
    }
    let skill = TeacherSkill {
        skill_id,
        category_id: input.category_id,
        category_name,
        about: input.about,
        video_card_link: input.video_card_link,
        rate: 0.0,
    };
    teacher.skills.push(skill.clone());
    Ok((StatusCode::CREATED, Json(skill)))
}

async fn get_teacher(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<TeacherProfile>> {
    let store = db.read().await;
    store
        .teachers
        .iter()
        .find(|t| t.teacher_id == id)
        .and_then(|t| store.teacher_profile(t))
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("teacher"))
}

async fn list_times(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<Vec<ScheduleSlot>>> {
    let store = db.read().await;
    if !store.teachers.iter().any(|t| t.teacher_id == id) {
        return Err(ApiFailure::not_found("teacher"));
    }
    Ok(Json(
        store
            .slots
            .iter()
            .filter(|s| s.teacher_id == id)
            .map(|s| s.slot.clone())
            .collect(),
    ))
}

async fn add_time(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewScheduleSlot>,
) -> ApiResult<(StatusCode, Json<ScheduleSlot>)> {
    let mut store = db.write().await;
    let user_id = caller(&store, &headers)?;
    let teacher_id = store
        .teachers
        .iter()
        .find(|t| t.user_id == user_id)
        .map(|t| t.teacher_id)
        .ok_or_else(|| {
            ApiFailure::new(
                StatusCode::FORBIDDEN,
                "register a skill before adding schedule times",
            )
        })?;
    let slot = store.insert_slot(teacher_id, input.datetime, true);
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn request_lesson(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<LessonRequest>,
) -> ApiResult<(StatusCode, Json<LessonConfirmation>)> {
    let mut store = db.write().await;
    let user_id = caller(&store, &headers)?;

    let teacher = store
        .teachers
        .iter()
        .find(|t| t.teacher_id == input.teacher_id)
        .ok_or_else(|| ApiFailure::not_found("teacher"))?;
    if teacher.user_id == user_id {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "cannot book a lesson with yourself",
        ));
    }
    if !teacher.skills.iter().any(|s| s.category_id == input.category_id) {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "teacher does not teach this category",
        ));
    }

    let slot = store
        .slots
        .iter_mut()
        .find(|s| s.teacher_id == input.teacher_id && s.slot.schedule_time_id == input.schedule_time_id)
        .ok_or_else(|| ApiFailure::not_found("schedule time"))?;
    if !slot.slot.is_available {
        return Err(ApiFailure::new(
            StatusCode::CONFLICT,
            "schedule time is no longer available",
        ));
    }
    slot.slot.is_available = false;

    let confirmation = LessonConfirmation {
        lesson_id: store.lessons.len() as i64 + 1,
        teacher_id: input.teacher_id,
        category_id: input.category_id,
        schedule_time_id: input.schedule_time_id,
        status: LessonStatus::Requested,
    };
    store.lessons.push(Lesson {
        student_user_id: user_id,
        confirmation: confirmation.clone(),
    });
    Ok((StatusCode::CREATED, Json(confirmation)))
}

async fn finish_lesson(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<LessonConfirmation>> {
    let mut store = db.write().await;
    let user_id = caller(&store, &headers)?;

    let (student_user_id, teacher_id, status) = store
        .lessons
        .iter()
        .find(|l| l.confirmation.lesson_id == id)
        .map(|l| {
            (
                l.student_user_id,
                l.confirmation.teacher_id,
                l.confirmation.status,
            )
        })
        .ok_or_else(|| ApiFailure::not_found("lesson"))?;
    let teacher_user_id = store
        .teachers
        .iter()
        .find(|t| t.teacher_id == teacher_id)
        .map(|t| t.user_id);
    if user_id != student_user_id && Some(user_id) != teacher_user_id {
        return Err(ApiFailure::new(
            StatusCode::FORBIDDEN,
            "not a participant of this lesson",
        ));
    }

    if status == LessonStatus::Requested {
        if let Some(teacher) = store.teachers.iter_mut().find(|t| t.teacher_id == teacher_id) {
            teacher.finished_lessons += 1;
        }
    }
    let lesson = store
        .lessons
        .iter_mut()
        .find(|l| l.confirmation.lesson_id == id)
        .ok_or_else(|| ApiFailure::not_found("lesson"))?;
    lesson.confirmation.status = LessonStatus::Finished;
    Ok(Json(lesson.confirmation.clone()))
}

async fn list_reviews(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<Vec<Review>>> {
    let store = db.read().await;
    if !store.teachers.iter().any(|t| t.teacher_id == id) {
        return Err(ApiFailure::not_found("teacher"));
    }
    Ok(Json(
        store
            .reviews
            .iter()
            .filter(|(teacher_id, _)| *teacher_id == id)
            .map(|(_, review)| review.clone())
            .collect(),
    ))
}

async fn get_avatar(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Response> {
    let store = db.read().await;
    let avatar = store
        .avatars
        .get(&id)
        .ok_or_else(|| ApiFailure::not_found("avatar"))?;
    Ok((
        [(header::CONTENT_TYPE, avatar.content_type.clone())],
        avatar.bytes.clone(),
    )
        .into_response())
}
