//! Full marketplace flow against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP. Validates that request building, the auth
//! interceptor and response parsing work end-to-end with the actual server,
//! and catches drift between the two crates' DTOs.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, TimeZone, Utc};
use tutor_core::{
    available_slots, ApiError, AuthToken, ClientConfig, Credentials, LessonRequest, LessonStatus,
    MemoryTokenStore, NewScheduleSlot, NewSkill, ProfilePatch, SignUp, TokenStore, Transport,
    TutorClient,
};

async fn start_mock_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await.unwrap() });
    format!("http://{addr}")
}

fn client(base_url: &str) -> (TutorClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let transport = Transport::new(ClientConfig::new(base_url), store.clone()).unwrap();
    (TutorClient::new(transport), store)
}

fn sign_up_input(email: &str) -> SignUp {
    SignUp {
        email: email.to_string(),
        password: "hunter2".to_string(),
        name: "Ada".to_string(),
        surname: "Lovelace".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
    }
}

#[tokio::test]
async fn reference_data_without_login() {
    let base = start_mock_server().await;
    let (client, _) = client(&base);

    let categories = client.get_categories().await.unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["math", "physics", "english"]);

    let teacher = client.get_teacher_by_id(1).await.unwrap();
    assert_eq!(teacher.name, "Marie");
    assert_eq!(teacher.primary_skill().unwrap().category_name, "physics");

    let reviews = client.get_teacher_reviews(1).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].student_name, "Pierre");

    let avatar = client
        .get_avatar(teacher.avatar.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(avatar.content_type, "image/png");
    assert_eq!(avatar.bytes, mock_server::SEED_AVATAR_BYTES);
}

#[tokio::test]
async fn unknown_teacher_is_not_found() {
    let base = start_mock_server().await;
    let (client, _) = client(&base);

    let err = client.get_teacher_by_id(999).await.unwrap_err();
    assert_matches!(err, ApiError::NotFound { .. });

    let err = client.get_time_by_id(999).await.unwrap_err();
    assert_matches!(err, ApiError::NotFound { .. });
}

#[tokio::test]
async fn login_and_remote_validation_errors() {
    let base = start_mock_server().await;
    let (client, _) = client(&base);

    let auth = client
        .login(&Credentials {
            email: mock_server::SEED_TEACHER_EMAIL.to_string(),
            password: mock_server::SEED_TEACHER_PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert!(!auth.token.is_empty());

    let err = client
        .login(&Credentials {
            email: mock_server::SEED_TEACHER_EMAIL.to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Server { status: 401, ref message } if message == "invalid email or password");

    let mut input = sign_up_input("");
    input.password = String::new();
    let err = client.sign_up(&input).await.unwrap_err();
    assert_matches!(err, ApiError::Server { status: 400, ref message } if message == "email and password are required");
}

#[tokio::test]
async fn profile_requires_a_token() {
    let base = start_mock_server().await;
    let (client, _) = client(&base);

    let err = client.get_user_profile().await.unwrap_err();
    assert_matches!(err, ApiError::Server { status: 401, .. });
}

#[tokio::test]
async fn profile_update_is_a_merge_patch() {
    let base = start_mock_server().await;
    let (client, store) = client(&base);

    let auth = client.sign_up(&sign_up_input("ada@b.com")).await.unwrap();
    store.set(AuthToken::new(auth.token)).unwrap();

    let before = client.get_user_profile().await.unwrap();
    assert_eq!(before.email, "ada@b.com");
    assert!(before.avatar.is_none());

    let patch = ProfilePatch {
        name: Some("Augusta".to_string()),
        birthdate: NaiveDate::from_ymd_opt(1991, 1, 2),
        avatar: Some("iVBORw0KGgo=".to_string()),
        ..Default::default()
    };
    let updated = client.update_profile(&patch).await.unwrap();
    let after = client.get_user_profile().await.unwrap();
    assert_eq!(updated, after);

    assert_eq!(after.name, "Augusta");
    assert_eq!(after.birthdate, NaiveDate::from_ymd_opt(1991, 1, 2).unwrap());
    assert_eq!(after.email, before.email);
    assert_eq!(after.surname, before.surname);
    assert_eq!(patch.apply_to(&before).name, after.name);

    let avatar_id = after.avatar.expect("uploaded avatar gets an id");
    let avatar = client.get_avatar(&avatar_id).await.unwrap();
    assert_eq!(avatar.bytes, vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);

    let err = client
        .update_profile(&ProfilePatch {
            email: Some(mock_server::SEED_TEACHER_EMAIL.to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Conflict { .. });
}

#[tokio::test]
async fn teacher_and_student_booking_flow() {
    let base = start_mock_server().await;

    // Teacher side: sign up, register a skill, open two slots.
    let (teacher_client, teacher_store) = client(&base);
    let auth = teacher_client.sign_up(&sign_up_input("t@b.com")).await.unwrap();
    teacher_store.set(AuthToken::new(auth.token)).unwrap();

    let err = teacher_client
        .add_time(&NewScheduleSlot {
            datetime: Utc.with_ymd_and_hms(2030, 3, 1, 10, 0, 0).unwrap(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Server { status: 403, .. });

    let skill = teacher_client
        .add_skill(&NewSkill {
            category_id: 1,
            video_card_link: Some("https://video.tutor.test/ada".to_string()),
            about: "Analytical engines".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(skill.category_name, "math");
    assert_eq!(skill.rate, 0.0);

    let late = teacher_client
        .add_time(&NewScheduleSlot {
            datetime: Utc.with_ymd_and_hms(2030, 3, 1, 15, 0, 0).unwrap(),
        })
        .await
        .unwrap();
    let early = teacher_client
        .add_time(&NewScheduleSlot {
            datetime: Utc.with_ymd_and_hms(2030, 3, 1, 9, 0, 0).unwrap(),
        })
        .await
        .unwrap();
    assert!(late.is_available && early.is_available);

    let me = teacher_client.get_user_profile().await.unwrap();
    assert_eq!(me.email, "t@b.com");

    // Student side: find the teacher and book the earliest open slot.
    let (student_client, student_store) = client(&base);
    let auth = student_client.sign_up(&sign_up_input("s@b.com")).await.unwrap();
    student_store.set(AuthToken::new(auth.token)).unwrap();

    let teacher_id = 2;
    let teacher = student_client.get_teacher_by_id(teacher_id).await.unwrap();
    assert_eq!(teacher.skills, vec![skill.clone()]);

    let slots = student_client.get_time_by_id(teacher_id).await.unwrap();
    let open = available_slots(&slots);
    assert_eq!(
        open.iter().map(|s| s.schedule_time_id).collect::<Vec<_>>(),
        vec![early.schedule_time_id, late.schedule_time_id]
    );

    let request = LessonRequest {
        teacher_id,
        category_id: skill.category_id,
        schedule_time_id: open[0].schedule_time_id,
    };
    let booked = student_client.lesson_request(&request).await.unwrap();
    assert_eq!(booked.status, LessonStatus::Requested);
    assert_eq!(booked.schedule_time_id, early.schedule_time_id);

    // The slot is gone for everyone else.
    let err = student_client.lesson_request(&request).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict { ref message } if message == "schedule time is no longer available");

    let slots = student_client.get_time_by_id(teacher_id).await.unwrap();
    assert_eq!(available_slots(&slots).len(), 1);

    // Finishing twice is a no-op the second time.
    let first = teacher_client.lesson_finish(booked.lesson_id).await.unwrap();
    let second = teacher_client.lesson_finish(booked.lesson_id).await.unwrap();
    assert_eq!(first.status, LessonStatus::Finished);
    assert_eq!(first, second);

    let teacher = student_client.get_teacher_by_id(teacher_id).await.unwrap();
    assert_eq!(teacher.finished_lessons, 1);

    let err = teacher_client.lesson_finish(999).await.unwrap_err();
    assert_matches!(err, ApiError::NotFound { .. });
}

#[tokio::test]
async fn signed_out_client_is_rejected_after_clear() {
    let base = start_mock_server().await;
    let (client, store) = client(&base);

    let auth = client.sign_up(&sign_up_input("x@b.com")).await.unwrap();
    store.set(AuthToken::new(auth.token)).unwrap();
    client.get_user_profile().await.unwrap();

    store.clear().unwrap();
    let err = client.get_user_profile().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}
