mod common;

use std::sync::Arc;

use amplia::api::models::{
    DonationDto, DonorType, LoginRequest, OngRegistrationRequest, ProjectDto, UserProfileDto, VolunteerDto,
};
use amplia::api::{ApiClient, NoToken, RequestOptions, TokenSource, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use common::{wrapped, MockApi, Reply};
use serde_json::{json, Value};

struct Fixed(&'static str);

impl TokenSource for Fixed {
    fn bearer_token(&self) -> Option<String> { Some(self.0.to_string()) }
}

#[tokio::test]
async fn envelope_is_unwrapped_and_headers_are_sent() {
    let api = MockApi::start(|_| Reply::ok(wrapped(json!({"x": 1})))).await;
    let client = ApiClient::new(&api.base, Arc::new(Fixed("t1")));

    let got: Value = client.request("/dashboard/stats/1", RequestOptions::get()).await.unwrap();
    assert_eq!(got, json!({"x": 1}));

    let seen = api.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.path, "/dashboard/stats/1");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer t1"));
    assert_eq!(seen.content_type.as_deref(), Some("application/json"));
    api.stop().await;
}

#[tokio::test]
async fn raw_payload_is_returned_as_is() {
    let api = MockApi::start(|_| Reply::ok(json!(["cooking", "music"]))).await;
    let client = ApiClient::new(&api.base, Arc::new(NoToken));

    let tags = client.all_tags().await.unwrap();
    assert_eq!(tags, vec!["cooking", "music"]);
    assert_eq!(api.last().path, "/profiles/tags");
    // anonymous clients send no credentials
    assert!(api.last().authorization.is_none());
    api.stop().await;
}

#[tokio::test]
async fn failed_envelope_surfaces_its_message_and_code() {
    let api = MockApi::start(|_| {
        Reply::ok(json!({"code": 42, "success": false, "model": {"x": 1}, "errorMessage": "group closed"}))
    })
    .await;
    let client = ApiClient::new(&api.base, Arc::new(NoToken));

    let err = client.total_donations(3).await.unwrap_err();
    assert_eq!(err.message(), "group closed");
    assert_eq!(err.status(), Some(200));
    assert_eq!(err.code(), Some(&json!(42)));
    assert_eq!(api.last().path, "/donations/group/3/total");
    api.stop().await;
}

#[tokio::test]
async fn non_json_error_body_names_the_status() {
    let api = MockApi::start(|_| Reply::text(404, "<html>Not Found</html>")).await;
    let client = ApiClient::new(&api.base, Arc::new(NoToken));

    let err = client.project("p-1").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.is_not_found());
    assert!(err.message().contains("404"), "{}", err.message());
    api.stop().await;
}

#[tokio::test]
async fn json_error_body_message_is_used() {
    let api = MockApi::start(|_| Reply::json(401, json!({"message": "Invalid credentials"}))).await;
    let client = ApiClient::new(&api.base, Arc::new(NoToken));

    let req = LoginRequest { email: "a@b.com".into(), password: "wrong".into() };
    let err = client.login(&req).await.unwrap_err();
    assert_eq!(err.message(), "Invalid credentials");
    assert!(err.is_unauthorized());

    let seen = api.last();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.body, json!({"email": "a@b.com", "password": "wrong"}));
    api.stop().await;
}

#[tokio::test]
async fn save_profile_picks_method_by_persistence() {
    let api = MockApi::start(|seen| Reply::ok(seen.body.clone())).await;
    let client = ApiClient::new(&api.base, Arc::new(Fixed("t1")));

    let mut profile = UserProfileDto::new_for("u1");
    profile.tags = vec!["cooking".into()];
    let created = client.save_profile(&profile).await.unwrap();
    assert_eq!(created.tags, vec!["cooking"]);
    let seen = api.last();
    assert_eq!((seen.method.as_str(), seen.path.as_str()), ("POST", "/profiles"));
    assert_eq!(seen.body["userGuid"], json!("u1"));

    profile.guid = Some("g-9".into());
    client.save_profile(&profile).await.unwrap();
    let seen = api.last();
    assert_eq!((seen.method.as_str(), seen.path.as_str()), ("PUT", "/profiles/u1"));
    api.stop().await;
}

#[tokio::test]
async fn query_parameters_are_built_and_encoded() {
    let page = json!({"content": [], "totalPages": 0, "totalElements": 0, "size": 9, "number": 0});
    let api = MockApi::start(move |seen| {
        if seen.path.starts_with("/volunteers/") {
            Reply::ok(json!({"guid": "v1", "name": "Ana", "email": "ana@vida.org", "groupId": 1, "hoursContributed": 2.5}))
        } else {
            Reply::ok(page.clone())
        }
    })
    .await;
    let client = ApiClient::new(&api.base, Arc::new(NoToken));

    client.volunteers(Some("all"), 0, 9).await.unwrap();
    assert_eq!(api.last().path, "/profiles/volunteers?page=0&size=9");
    client.volunteers(Some("first aid"), 2, 9).await.unwrap();
    assert_eq!(api.last().path, "/profiles/volunteers?tag=first%20aid&page=2&size=9");

    let volunteer = client.add_volunteer_hours("v1", 2.5).await.unwrap();
    assert_eq!(volunteer.name, "Ana");
    assert_eq!(volunteer.hours_contributed, Some(2.5));
    let seen = api.last();
    assert_eq!(seen.method, "PATCH");
    assert_eq!(seen.path, "/volunteers/v1/hours?hours=2.5");
    api.stop().await;
}

#[tokio::test]
async fn transport_failure_has_no_status() {
    // bind then drop to get a port nothing listens on
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let client = ApiClient::new(&format!("http://127.0.0.1:{}/api", port), Arc::new(NoToken));
    let err = client.all_tags().await.unwrap_err();
    assert_eq!(err.status(), None);
    assert!(!err.message().is_empty());
}

// Answers every endpoint with a body its return type decodes.
fn endpoint_reply(seen: &common::Seen) -> Reply {
    let path = seen.path.split('?').next().unwrap_or_default();
    let page = |item: Value| json!({"content": [item], "totalPages": 1, "totalElements": 1, "size": 10, "number": 0});
    let donation = json!({"amount": 25.0, "donorName": "Ana", "donorType": "INDIVIDUAL", "groupId": 3});
    let volunteer = json!({"guid": "v1", "name": "Ana", "email": "ana@vida.org", "groupId": 3});
    let project = json!({"guid": "p1", "name": "Well", "goalAmount": 1000.0, "groupId": 3});
    let profile = json!({"guid": "g1", "userGuid": "u 1", "tags": ["first aid"]});
    let body = match (seen.method.as_str(), path) {
        ("POST", "/auth/register/ong") => json!({"message": "created"}),
        ("POST", "/donations") => donation,
        ("POST", "/volunteers") => volunteer,
        ("POST", "/projects") => project,
        (_, "/donations/group/3") => page(donation),
        (_, "/volunteers/group/3") => page(volunteer),
        (_, "/projects/group/3") => page(project),
        (_, "/dashboard/stats/3") => json!({
            "totalRaised": 10.0, "monthlyGrowthPercentage": 1.5, "activeVolunteers": 4,
            "newVolunteersThisWeek": 1, "projectGoalPercentage": 20.0, "totalHoursDonated": 12.0,
            "totalDonations": 2, "activeProjects": 1
        }),
        (_, "/profiles/search") => json!([profile]),
        (_, p) if p.starts_with("/profiles/") => profile,
        (_, p) if p.starts_with("/history/") || p.starts_with("/certificates/") => json!([{"id": 1}]),
        _ => json!({"ok": true}),
    };
    Reply::ok(wrapped(body))
}

#[tokio::test]
async fn every_endpoint_hits_its_route() {
    let api = MockApi::start(endpoint_reply).await;
    let client = ApiClient::new(&api.base, Arc::new(Fixed("t1")));

    let ong = OngRegistrationRequest {
        organization_name: "Vida".into(),
        cnpj: "12345678000199".into(),
        admin_first_name: "Ana".into(),
        admin_last_name: "Souza".into(),
        admin_email: "ana@vida.org".into(),
        admin_password: "secret1".into(),
    };
    let donation = DonationDto {
        guid: None,
        amount: 25.0,
        donor_name: "Ana".into(),
        donor_type: DonorType::Individual,
        status: None,
        donation_date: None,
        group_id: 3,
        project_guid: None,
        notes: None,
    };
    let volunteer = VolunteerDto {
        guid: None,
        name: "Ana".into(),
        email: "ana@vida.org".into(),
        role: None,
        hours_contributed: None,
        status: None,
        group_id: 3,
        avatar_url: None,
    };
    let project = ProjectDto {
        guid: None,
        name: "Well".into(),
        description: None,
        goal_amount: 1000.0,
        current_amount: None,
        status: None,
        start_date: None,
        end_date: None,
        group_id: 3,
        progress_percentage: None,
    };

    let mut expected: Vec<(&str, &str)> = Vec::new();
    let mut check = |method: &'static str, path: &'static str| expected.push((method, path));

    client.register_ong(&ong).await.unwrap();
    check("POST", "/auth/register/ong");
    assert_eq!(client.create_donation(&donation).await.unwrap().donor_name, "Ana");
    check("POST", "/donations");
    assert_eq!(client.donations_by_group(3, DEFAULT_PAGE, DEFAULT_PAGE_SIZE).await.unwrap().content.len(), 1);
    check("GET", "/donations/group/3?page=0&size=10");
    assert_eq!(client.create_volunteer(&volunteer).await.unwrap().guid.as_deref(), Some("v1"));
    check("POST", "/volunteers");
    client.volunteers_by_group(3, DEFAULT_PAGE, DEFAULT_PAGE_SIZE).await.unwrap();
    check("GET", "/volunteers/group/3?page=0&size=10");
    assert_eq!(client.create_project(&project).await.unwrap().guid.as_deref(), Some("p1"));
    check("POST", "/projects");
    client.projects_by_group(3, 2, 5).await.unwrap();
    check("GET", "/projects/group/3?page=2&size=5");
    assert_eq!(client.dashboard_stats(3).await.unwrap().active_volunteers, 4);
    check("GET", "/dashboard/stats/3");
    client.volunteer_dashboard("u 1").await.unwrap();
    check("GET", "/volunteer-dashboard/u%201");
    assert_eq!(client.volunteer_history("u 1").await.unwrap().len(), 1);
    check("GET", "/history/volunteer/u%201");
    assert_eq!(client.volunteer_certificates("u 1").await.unwrap().len(), 1);
    check("GET", "/certificates/volunteer/u%201");
    assert_eq!(client.user_profile("u 1").await.unwrap().user_guid, "u 1");
    check("GET", "/profiles/u%201");
    assert_eq!(client.search_profiles_by_tag("first aid").await.unwrap()[0].tags, vec!["first aid"]);
    check("GET", "/profiles/search?tag=first%20aid");

    let seen: Vec<(String, String)> = api.seen().into_iter().map(|s| (s.method, s.path)).collect();
    let expected: Vec<(String, String)> = expected.into_iter().map(|(m, p)| (m.to_string(), p.to_string())).collect();
    assert_eq!(seen, expected);

    let created = api.seen().into_iter().find(|s| s.path == "/auth/register/ong").unwrap();
    assert_eq!(created.body["adminEmail"], json!("ana@vida.org"));
    assert!(api.seen().iter().all(|s| s.authorization.as_deref() == Some("Bearer t1")));
    api.stop().await;
}
