//! Role enforcement inside an organization.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

/// U creates O and C and invites V as TEACHER. V may add an assignment to C
/// but may not create a course in O. W, a stranger, cannot see C.
#[tokio::test]
async fn organizer_teacher_stranger_scenario() {
    let app = common::app();
    let u = app.signup("u@x.com").await;
    let v = app.signup("v@x.com").await;
    let w = app.signup("w@x.com").await;

    let org = app.create_org(&u, "O").await;
    let course = app.create_course(&u, &org, "C").await;
    app.invite(&u, &org, "v@x.com", "TEACHER").await;

    let (status, body) = app
        .post(
            &format!("/courses/{course}/assignments"),
            &v.access,
            json!({"title": "A1", "dueAt": "2030-01-01T00:00:00Z", "points": 10}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .post(
            "/courses",
            &v.access,
            json!({"orgId": org, "code": "C2", "title": "Second"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = app.get(&format!("/courses/{course}"), &w.access).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_organizers_create_courses() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    let student = app.signup("s@x.com").await;
    let org = app.create_org(&owner, "Org").await;
    app.invite(&owner, &org, "s@x.com", "STUDENT").await;

    let (status, _) = app
        .post(
            "/courses",
            &student.access,
            json!({"orgId": org, "code": "S1", "title": "Nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/courses",
            &owner.access,
            json!({"orgId": org, "code": "O1", "title": "Yes"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn course_creation_needs_a_valid_org_id() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    app.create_org(&owner, "Org").await;

    for body in [
        json!({"code": "X", "title": "X"}),
        json!({"orgId": "", "code": "X", "title": "X"}),
        json!({"orgId": "not-a-uuid", "code": "X", "title": "X"}),
    ] {
        let (status, resp) = app.post("/courses", &owner.access, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
    }
}

#[tokio::test]
async fn students_cannot_author_course_content() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    let student = app.signup("s@x.com").await;
    let org = app.create_org(&owner, "Org").await;
    let course = app.create_course(&owner, &org, "C").await;
    app.invite(&owner, &org, "s@x.com", "STUDENT").await;

    let (status, _) = app
        .post(&format!("/courses/{course}/modules"), &student.access, json!({"title": "M"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/courses/{course}/assignments"),
            &student.access,
            json!({"title": "A", "dueAt": "2030-01-01T00:00:00Z", "points": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Discussions are open to every member.
    let (status, _) = app
        .post(
            &format!("/courses/{course}/threads"),
            &student.access,
            json!({"title": "Q", "body": "?"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn grading_is_limited_to_instructors_of_the_owning_org() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    let teacher = app.signup("t@x.com").await;
    let foreign_teacher = app.signup("ft@y.com").await;
    let student = app.signup("s@x.com").await;

    let org = app.create_org(&owner, "Org").await;
    let course = app.create_course(&owner, &org, "C").await;
    app.invite(&owner, &org, "t@x.com", "TEACHER").await;
    app.invite(&owner, &org, "s@x.com", "STUDENT").await;

    let other_owner = app.signup("oo@y.com").await;
    let other_org = app.create_org(&other_owner, "Other").await;
    app.invite(&other_owner, &other_org, "ft@y.com", "TEACHER").await;

    let assignment = app.create_assignment(&teacher, &course, 10).await;
    let (status, submission) = app
        .post(
            &format!("/assignments/{assignment}/submissions"),
            &student.access,
            json!({"fileUrl": "https://f/essay.pdf"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let grade_uri = format!("/submissions/{}/grade", submission["id"].as_str().unwrap());

    let (status, _) = app
        .post(&grade_uri, &foreign_teacher.access, json!({"grade": 10}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post(&grade_uri, &student.access, json!({"grade": 10})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for out_of_range in [-1, 11] {
        let (status, _) = app
            .post(&grade_uri, &teacher.access, json!({"grade": out_of_range}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, graded) = app
        .post(&grade_uri, &teacher.access, json!({"grade": 10, "feedback": "   "}))
        .await;
    assert_eq!(status, StatusCode::OK, "{graded}");
    assert_eq!(graded["status"], "GRADED");
    assert_eq!(graded["grade"], 10);
    assert!(graded["feedback"].is_null());
    assert_eq!(graded["userId"], student.id.as_str());
}

#[tokio::test]
async fn students_see_only_their_own_submissions() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    let alice = app.signup("alice@x.com").await;
    let bob = app.signup("bob@x.com").await;
    let org = app.create_org(&owner, "Org").await;
    let course = app.create_course(&owner, &org, "C").await;
    app.invite(&owner, &org, "alice@x.com", "STUDENT").await;
    app.invite(&owner, &org, "bob@x.com", "STUDENT").await;
    let assignment = app.create_assignment(&owner, &course, 10).await;

    let submit_uri = format!("/assignments/{assignment}/submissions");
    let (_, alice_sub) = app.post(&submit_uri, &alice.access, json!({})).await;
    let (_, _) = app.post(&submit_uri, &bob.access, json!({})).await;

    let (_, as_alice) = app.get(&format!("/assignments/{assignment}"), &alice.access).await;
    let seen = as_alice["submissions"].as_array().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["userId"], alice.id.as_str());

    let (_, as_owner) = app.get(&format!("/assignments/{assignment}"), &owner.access).await;
    assert_eq!(as_owner["submissions"].as_array().unwrap().len(), 2);

    let alice_sub_uri = format!("/submissions/{}", alice_sub["id"].as_str().unwrap());
    assert_eq!(app.get(&alice_sub_uri, &alice.access).await.0, StatusCode::OK);
    assert_eq!(app.get(&alice_sub_uri, &bob.access).await.0, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&alice_sub_uri, &owner.access).await.0, StatusCode::OK);
}

#[tokio::test]
async fn assignment_list_tracks_the_callers_progress() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    let student = app.signup("s@x.com").await;
    let org = app.create_org(&owner, "Org").await;
    let course = app.create_course(&owner, &org, "C").await;
    app.invite(&owner, &org, "s@x.com", "STUDENT").await;
    let assignment = app.create_assignment(&owner, &course, 10).await;
    let list_uri = format!("/courses/{course}/assignments");

    let status_of = |list: &serde_json::Value| list[0]["submissionStatus"].as_str().unwrap().to_string();

    let (_, list) = app.get(&list_uri, &student.access).await;
    assert_eq!(status_of(&list), "NOT_STARTED");

    let (status, sub) = app
        .post(&format!("/assignments/{assignment}/submissions"), &student.access, json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, list) = app.get(&list_uri, &student.access).await;
    assert_eq!(status_of(&list), "SUBMITTED");

    app.post(
        &format!("/submissions/{}/grade", sub["id"].as_str().unwrap()),
        &owner.access,
        json!({"grade": 7}),
    )
    .await;
    let (_, list) = app.get(&list_uri, &student.access).await;
    assert_eq!(status_of(&list), "GRADED");

    // Resubmitting resets to SUBMITTED on the same row.
    let (status, again) = app
        .post(&format!("/assignments/{assignment}/submissions"), &student.access, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], sub["id"]);
    assert_eq!(again["status"], "SUBMITTED");
}

#[tokio::test]
async fn member_management_is_organizer_only() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    let teacher = app.signup("t@x.com").await;
    app.signup("s@x.com").await;
    let org = app.create_org(&owner, "Org").await;
    app.invite(&owner, &org, "t@x.com", "TEACHER").await;

    let (status, _) = app
        .post(
            &format!("/organizations/{org}/invite"),
            &teacher.access,
            json!({"email": "s@x.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/organizations/members", Some(&teacher.access), Some(&org), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, members) = app
        .get(&format!("/organizations/members?orgId={org}"), &owner.access)
        .await;
    assert_eq!(status, StatusCode::OK, "{members}");
    assert_eq!(members.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/organizations/members", &owner.access).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .call(Method::GET, "/organizations/members", Some(&owner.access), Some("org-1"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invite_edge_cases() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    app.signup("s@x.com").await;
    let org = app.create_org(&owner, "Org").await;
    let invite_uri = format!("/organizations/{org}/invite");

    let (status, _) = app
        .post(&invite_uri, &owner.access, json!({"email": "ghost@x.com"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(&invite_uri, &owner.access, json!({"email": " S@X.com "}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "STUDENT");

    let (status, _) = app
        .post(&invite_uri, &owner.access, json!({"email": "s@x.com"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(&invite_uri, &owner.access, json!({"email": "o@x.com", "role": "BOSS"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn current_org_course_listing_uses_the_org_hint() {
    let app = common::app();
    let owner = app.signup("o@x.com").await;
    let org = app.create_org(&owner, "Org").await;
    app.create_course(&owner, &org, "C1").await;
    app.create_course(&owner, &org, "C2").await;

    let (status, body) = app
        .call(Method::GET, "/courses", Some(&owner.access), Some(&org), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app.get(&format!("/courses?orgId={org}"), &owner.access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/courses", &owner.access).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
