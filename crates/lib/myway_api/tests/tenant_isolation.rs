//! A principal with no membership in an organization can neither read nor
//! mutate anything it owns, and cannot tell its resources from missing ones.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

struct Tenant {
    org: String,
    course: String,
    module: String,
    material: String,
    assignment: String,
    submission: String,
    thread: String,
}

async fn seed(app: &common::TestApp, owner: &common::User) -> Tenant {
    let org = app.create_org(owner, "Tenant A").await;
    let course = app.create_course(owner, &org, "A101").await;

    let (_, module) = app
        .post(
            &format!("/courses/{course}/modules"),
            &owner.access,
            json!({"title": "Week 1"}),
        )
        .await;
    let module = module["id"].as_str().unwrap().to_string();

    let (_, material) = app
        .post(
            &format!("/modules/{module}/materials"),
            &owner.access,
            json!({"kind": "video", "title": "Lecture", "sourceUrl": "https://v/1"}),
        )
        .await;
    let material = material["id"].as_str().unwrap().to_string();

    let assignment = app.create_assignment(owner, &course, 10).await;
    let (_, submission) = app
        .post(
            &format!("/assignments/{assignment}/submissions"),
            &owner.access,
            json!({"fileUrl": "https://f/1"}),
        )
        .await;
    let submission = submission["id"].as_str().unwrap().to_string();

    let (_, thread) = app
        .post(
            &format!("/courses/{course}/threads"),
            &owner.access,
            json!({"title": "Welcome", "body": "Hi all"}),
        )
        .await;
    let thread = thread["id"].as_str().unwrap().to_string();

    Tenant {
        org,
        course,
        module,
        material,
        assignment,
        submission,
        thread,
    }
}

fn resource_reads(t: &Tenant) -> Vec<String> {
    vec![
        format!("/courses/{}", t.course),
        format!("/courses/{}/modules", t.course),
        format!("/courses/{}/assignments", t.course),
        format!("/courses/{}/threads", t.course),
        format!("/modules/{}", t.module),
        format!("/modules/{}/materials", t.module),
        format!("/materials/{}", t.material),
        format!("/assignments/{}", t.assignment),
        format!("/submissions/{}", t.submission),
        format!("/threads/{}", t.thread),
    ]
}

fn resource_writes(t: &Tenant) -> Vec<(String, Value)> {
    vec![
        (format!("/courses/{}/modules", t.course), json!({"title": "X"})),
        (
            format!("/modules/{}/materials", t.module),
            json!({"kind": "TEXT", "title": "X"}),
        ),
        (
            format!("/courses/{}/assignments", t.course),
            json!({"title": "X", "dueAt": "2030-01-01T00:00:00Z", "points": 5}),
        ),
        (format!("/assignments/{}/submissions", t.assignment), json!({})),
        (format!("/submissions/{}/grade", t.submission), json!({"grade": 1})),
        (
            format!("/courses/{}/threads", t.course),
            json!({"title": "X", "body": "Y"}),
        ),
        (format!("/threads/{}/replies", t.thread), json!({"body": "Y"})),
    ]
}

#[tokio::test]
async fn outsider_gets_not_found_on_every_resource_read() {
    let app = common::app();
    let owner = app.signup("owner@a.com").await;
    let tenant = seed(&app, &owner).await;

    let outsider = app.signup("w@b.com").await;
    let own_org = app.create_org(&outsider, "Tenant B").await;

    for uri in resource_reads(&tenant) {
        let (status, body) = app.get(&uri, &outsider.access).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}: {body}");
        assert_eq!(body["message"], "Resource not found", "{uri}");

        // Claiming one's own org in the header does not help.
        let (status, _) = app
            .call(Method::GET, &uri, Some(&outsider.access), Some(&own_org), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri} with own org header");
    }
}

#[tokio::test]
async fn outsider_gets_not_found_on_every_resource_write() {
    let app = common::app();
    let owner = app.signup("owner@a.com").await;
    let tenant = seed(&app, &owner).await;
    let outsider = app.signup("w@b.com").await;

    for (uri, body) in resource_writes(&tenant) {
        let (status, resp) = app.post(&uri, &outsider.access, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}: {resp}");
    }
}

#[tokio::test]
async fn existing_and_missing_resources_are_indistinguishable_to_outsiders() {
    let app = common::app();
    let owner = app.signup("owner@a.com").await;
    let tenant = seed(&app, &owner).await;
    let outsider = app.signup("w@b.com").await;

    let (s1, b1) = app
        .get(&format!("/courses/{}", tenant.course), &outsider.access)
        .await;
    let (s2, b2) = app
        .get(&format!("/courses/{}", Uuid::new_v4()), &outsider.access)
        .await;
    assert_eq!(s1, s2);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn outsider_is_forbidden_on_direct_org_operations() {
    let app = common::app();
    let owner = app.signup("owner@a.com").await;
    let tenant = seed(&app, &owner).await;
    let outsider = app.signup("w@b.com").await;

    let (status, _) = app
        .get(&format!("/organizations/{}/courses", tenant.org), &outsider.access)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/courses", Some(&outsider.access), Some(&tenant.org), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/courses",
            &outsider.access,
            json!({"orgId": tenant.org, "code": "HACK", "title": "Hack"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/organizations/{}/switch", tenant.org),
            &outsider.access,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owner_still_reads_everything() {
    let app = common::app();
    let owner = app.signup("owner@a.com").await;
    let tenant = seed(&app, &owner).await;

    for uri in resource_reads(&tenant) {
        let (status, body) = app.get(&uri, &owner.access).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
    }
}

#[tokio::test]
async fn leaving_revokes_access_immediately() {
    let app = common::app();
    let owner = app.signup("owner@a.com").await;
    let tenant = seed(&app, &owner).await;
    let student = app.signup("s@a.com").await;

    let (status, _) = app
        .post(&format!("/organizations/{}/join", tenant.org), &student.access, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let course_uri = format!("/courses/{}", tenant.course);
    assert_eq!(app.get(&course_uri, &student.access).await.0, StatusCode::OK);

    let (status, _) = app
        .post(&format!("/organizations/{}/leave", tenant.org), &student.access, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.get(&course_uri, &student.access).await.0, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(&format!("/organizations/{}/join", tenant.org), &student.access, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "STUDENT");
    assert_eq!(body["status"], "Active");
    assert_eq!(app.get(&course_uri, &student.access).await.0, StatusCode::OK);
}
