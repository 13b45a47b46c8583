//! Typed API client for the tutoring marketplace backend.
//!
//! # Overview
//! One configured `Transport` (base URL, timeout, JSON content type) attaches
//! the caller's bearer token to every request and normalizes failures into
//! `ApiError`. `TutorClient` layers one typed method per domain action on top
//! of it: login, sign-up, profile fetch/update, categories, skills, schedule
//! slots, lesson booking/finishing, reviews and avatars.
//!
//! # Design
//! - No global client: build a `Transport` from a `ClientConfig` and an
//!   injected `TokenStore`, then wrap it in a `TutorClient`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - Errors are a tagged enum; `ApiError::kind()` tells server rejections
//!   from transport failures. No retries happen here.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod token;
pub mod transport;
pub mod types;

pub use client::TutorClient;
pub use config::{ClientConfig, ConfigError, DEFAULT_TIMEOUT};
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use token::{AuthToken, MemoryTokenStore, TokenStore, TokenStoreError};
pub use transport::Transport;
pub use types::{
    available_slots, AuthResponse, Avatar, Category, Credentials, LessonConfirmation,
    LessonRequest, LessonStatus, NewScheduleSlot, NewSkill, ProfilePatch, Review, ScheduleSlot,
    SignUp, TeacherProfile, TeacherSkill, UserProfile,
};
pub use tokio_util::sync::CancellationToken;
