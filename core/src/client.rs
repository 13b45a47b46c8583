//! Typed domain operations for the tutoring API.
//!
//! # Design
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`;
//! the async method of the same name runs one through `Transport` and hands
//! the result to the other. Build and parse never touch the network, so the
//! wire shape of every operation is testable on its own.
//!
//! No business validation happens here. Whatever the server rejects comes
//! back verbatim as an `ApiError`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{normalize_response, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{
    AuthResponse, Avatar, Category, Credentials, LessonConfirmation, LessonId, LessonRequest,
    NewScheduleSlot, NewSkill, ProfilePatch, Review, ScheduleSlot, SignUp, TeacherId,
    TeacherProfile, TeacherSkill, UserProfile,
};

const DEFAULT_AVATAR_CONTENT_TYPE: &str = "application/octet-stream";

/// Client for the tutoring marketplace API.
///
/// Cheap to clone; clones share the connection pool and token store.
#[derive(Clone)]
pub struct TutorClient {
    transport: Transport,
    cancel: Option<CancellationToken>,
}

impl TutorClient {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            cancel: None,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// A client whose requests all fail with a transport error once
    /// `cancel` fires, e.g. when the owning screen goes away.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            transport: self.transport.clone(),
            cancel: Some(cancel),
        }
    }

    // ---------------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------------

    pub async fn login(&self, input: &Credentials) -> Result<AuthResponse, ApiError> {
        let req = self.build_login(input)?;
        self.parse_login(self.execute(req).await?)
    }

    pub async fn sign_up(&self, input: &SignUp) -> Result<AuthResponse, ApiError> {
        let req = self.build_sign_up(input)?;
        self.parse_sign_up(self.execute(req).await?)
    }

    pub async fn get_user_profile(&self) -> Result<UserProfile, ApiError> {
        let req = self.build_get_user_profile();
        self.parse_get_user_profile(self.execute(req).await?)
    }

    /// Merge-patch the caller's profile; see `ProfilePatch`.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, ApiError> {
        let req = self.build_update_profile(patch)?;
        self.parse_update_profile(self.execute(req).await?)
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        let req = self.build_get_categories();
        self.parse_get_categories(self.execute(req).await?)
    }

    pub async fn add_skill(&self, input: &NewSkill) -> Result<TeacherSkill, ApiError> {
        let req = self.build_add_skill(input)?;
        self.parse_add_skill(self.execute(req).await?)
    }

    /// Fails with `ApiError::NotFound` for unknown ids.
    pub async fn get_teacher_by_id(&self, id: TeacherId) -> Result<TeacherProfile, ApiError> {
        let req = self.build_get_teacher_by_id(id);
        self.parse_get_teacher_by_id(self.execute(req).await?)
    }

    /// All of a teacher's slots, booked or not. See `types::available_slots`.
    pub async fn get_time_by_id(&self, teacher_id: TeacherId) -> Result<Vec<ScheduleSlot>, ApiError> {
        let req = self.build_get_time_by_id(teacher_id);
        self.parse_get_time_by_id(self.execute(req).await?)
    }

    pub async fn add_time(&self, input: &NewScheduleSlot) -> Result<ScheduleSlot, ApiError> {
        let req = self.build_add_time(input)?;
        self.parse_add_time(self.execute(req).await?)
    }

    /// Fails with `ApiError::Conflict` when the slot has already been taken.
    pub async fn lesson_request(&self, input: &LessonRequest) -> Result<LessonConfirmation, ApiError> {
        let req = self.build_lesson_request(input)?;
        self.parse_lesson_request(self.execute(req).await?)
    }

    /// Finishing an already finished lesson returns the same confirmation.
    pub async fn lesson_finish(&self, lesson_id: LessonId) -> Result<LessonConfirmation, ApiError> {
        let req = self.build_lesson_finish(lesson_id);
        self.parse_lesson_finish(self.execute(req).await?)
    }

    pub async fn get_avatar(&self, avatar_id: &str) -> Result<Avatar, ApiError> {
        let req = self.build_get_avatar(avatar_id);
        self.parse_get_avatar(self.execute(req).await?)
    }

    pub async fn get_teacher_reviews(&self, teacher_id: TeacherId) -> Result<Vec<Review>, ApiError> {
        let req = self.build_get_teacher_reviews(teacher_id);
        self.parse_get_teacher_reviews(self.execute(req).await?)
    }

    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        match &self.cancel {
            Some(cancel) => self.transport.execute_cancellable(req, cancel).await,
            None => self.transport.execute(req).await,
        }
    }

    // ---------------------------------------------------------------------
    // Request builders
    // ---------------------------------------------------------------------

    pub fn build_login(&self, input: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login", input)
    }

    pub fn build_sign_up(&self, input: &SignUp) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/signup", input)
    }

    pub fn build_get_user_profile(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/users/me")
    }

    pub fn build_update_profile(&self, patch: &ProfilePatch) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Patch, "/users/me", patch)
    }

    pub fn build_get_categories(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/categories")
    }

    pub fn build_add_skill(&self, input: &NewSkill) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/teachers/me/skills", input)
    }

    pub fn build_get_teacher_by_id(&self, id: TeacherId) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/teachers/{id}"))
    }

    pub fn build_get_time_by_id(&self, teacher_id: TeacherId) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/teachers/{teacher_id}/times"))
    }

    pub fn build_add_time(&self, input: &NewScheduleSlot) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/teachers/me/times", input)
    }

    pub fn build_lesson_request(&self, input: &LessonRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/lessons", input)
    }

    pub fn build_lesson_finish(&self, lesson_id: LessonId) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/lessons/{lesson_id}/finish"))
    }

    pub fn build_get_avatar(&self, avatar_id: &str) -> HttpRequest {
        let id = urlencoding::encode(avatar_id);
        self.request(HttpMethod::Get, &format!("/avatars/{id}"))
    }

    pub fn build_get_teacher_reviews(&self, teacher_id: TeacherId) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/teachers/{teacher_id}/reviews"))
    }

    // ---------------------------------------------------------------------
    // Response parsers
    // ---------------------------------------------------------------------

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        parse_json(response)
    }

    pub fn parse_sign_up(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_user_profile(&self, response: HttpResponse) -> Result<UserProfile, ApiError> {
        parse_json(response)
    }

    pub fn parse_update_profile(&self, response: HttpResponse) -> Result<UserProfile, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_categories(&self, response: HttpResponse) -> Result<Vec<Category>, ApiError> {
        parse_json(response)
    }

    pub fn parse_add_skill(&self, response: HttpResponse) -> Result<TeacherSkill, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_teacher_by_id(&self, response: HttpResponse) -> Result<TeacherProfile, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_time_by_id(&self, response: HttpResponse) -> Result<Vec<ScheduleSlot>, ApiError> {
        parse_json(response)
    }

    pub fn parse_add_time(&self, response: HttpResponse) -> Result<ScheduleSlot, ApiError> {
        parse_json(response)
    }

    pub fn parse_lesson_request(&self, response: HttpResponse) -> Result<LessonConfirmation, ApiError> {
        parse_json(response)
    }

    pub fn parse_lesson_finish(&self, response: HttpResponse) -> Result<LessonConfirmation, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_avatar(&self, response: HttpResponse) -> Result<Avatar, ApiError> {
        let response = normalize_response(response)?;
        let content_type = response
            .header("content-type")
            .unwrap_or(DEFAULT_AVATAR_CONTENT_TYPE)
            .to_string();
        Ok(Avatar {
            content_type,
            bytes: response.body,
        })
    }

    pub fn parse_get_teacher_reviews(&self, response: HttpResponse) -> Result<Vec<Review>, ApiError> {
        parse_json(response)
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.transport.url(path))
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(method, path).with_json_body(body))
    }
}

/// Normalize, then deserialize a 2xx JSON body.
fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    let response = normalize_response(response)?;
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
