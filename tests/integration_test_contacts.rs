mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::Value;
use std::collections::HashSet;

fn ids(body: &Value) -> Vec<i64> {
    body["contacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_search_requires_every_token_in_some_field() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    let john = app
        .create_contact(&session, &[("firstName", "John"), ("lastName", "Smith"), ("email", "john@acme.io"), ("companyName", "Acme")])
        .await;
    let jane = app
        .create_contact(&session, &[("firstName", "Jane"), ("lastName", "Doe"), ("email", "jane@acme.io"), ("companyName", "Acme")])
        .await;
    app.create_contact(&session, &[("firstName", "Johnny"), ("lastName", "Ray"), ("email", "johnny@globex.io"), ("companyName", "Globex")])
        .await;

    let (status, body) = app.get(&session, "/api/v1/contacts?query=john%20acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![john]);
    assert_eq!(body["query"], "john acme");

    let (_, body) = app.get(&session, "/api/v1/contacts?query=ACME").await;
    let found: HashSet<i64> = ids(&body).into_iter().collect();
    assert_eq!(found, HashSet::from([john, jane]));
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = app.get(&session, "/api/v1/contacts?query=zzz").await;
    assert!(ids(&body).is_empty());
    assert_eq!(body["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn test_search_matches_tag_names() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    let vip = app
        .create_contact(&session, &[("firstName", "Ada"), ("lastName", "Lovelace"), ("email", "ada@example.com"), ("tags", "VIP")])
        .await;
    app.create_contact(&session, &[("firstName", "Alan"), ("lastName", "Turing"), ("email", "alan@example.com")])
        .await;

    let (_, body) = app.get(&session, "/api/v1/contacts?query=vip").await;
    assert_eq!(ids(&body), vec![vip]);
}

#[tokio::test]
async fn test_tag_grouping_places_contact_in_every_tag() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    app.create_contact(&session, &[("firstName", "A"), ("lastName", "One"), ("email", "a@example.com"), ("tags", "VIP"), ("tags", "Lead")])
        .await;
    app.create_contact(&session, &[("firstName", "B"), ("lastName", "Two"), ("email", "b@example.com"), ("tagsCSV", "Lead")])
        .await;
    app.create_contact(&session, &[("firstName", "C"), ("lastName", "Three"), ("email", "c@example.com")])
        .await;

    let (status, body) = app.get(&session, "/api/v1/contacts?groupBy=tag").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groupBy"], "tag");

    let labels: Vec<&str> = body["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Lead (2)", "No tags (1)", "VIP (1)"]);

    let (_, body) = app.get(&session, "/api/v1/contacts?groupBy=city").await;
    assert_eq!(body["groups"][0]["key"], "No city");
    assert_eq!(body["groups"][0]["label"], "No city (3)");

    let (_, body) = app.get(&session, "/api/v1/contacts").await;
    assert_eq!(body["groups"][0]["key"], "all");
    assert_eq!(body["groups"][0]["label"], "All (3)");
}

#[tokio::test]
async fn test_pages_are_disjoint_and_complete() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    let mut created = HashSet::new();
    for i in 0..25 {
        let email = format!("person{}@example.com", i);
        let id = app
            .create_contact(&session, &[("firstName", "Same"), ("lastName", "Name"), ("email", email.as_str())])
            .await;
        created.insert(id);
    }

    let (_, first) = app.get(&session, "/api/v1/contacts?page=1").await;
    let (_, second) = app.get(&session, "/api/v1/contacts?page=2").await;
    let (_, third) = app.get(&session, "/api/v1/contacts?page=3").await;

    assert_eq!(first["pagination"]["totalPages"], 2);
    assert_eq!(first["pagination"]["total"], 25);
    assert_eq!(ids(&first).len(), 20);
    assert_eq!(ids(&second).len(), 5);
    assert!(ids(&third).is_empty());

    let mut seen: Vec<i64> = ids(&first);
    seen.extend(ids(&second));
    let unique: HashSet<i64> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "pages overlap");
    assert_eq!(unique, created);

    // Identical names fall back to id order.
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted);
}

#[tokio::test]
async fn test_duplicate_tags_resolve_to_one_link() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    let fields = [
        ("firstName", "Ada"),
        ("lastName", "Lovelace"),
        ("email", "ada@example.com"),
        ("tags", "VIP"),
        ("tags", "VIP"),
        ("tags", "vip"),
    ];
    let id = app.create_contact(&session, &fields).await;

    let id_str = id.to_string();
    let mut update = vec![("id", id_str.as_str())];
    update.extend_from_slice(&fields);
    let (_, body) = app.post_form(&session, "/api/v1/contacts", &update).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Contact updated");

    assert_eq!(app.count("tags").await, 1);
    assert_eq!(app.count("contact_tags").await, 1);

    let (_, contact) = app.get(&session, &format!("/api/v1/contacts/{}", id)).await;
    assert_eq!(contact["tags"][0]["name"], "VIP");
}

#[tokio::test]
async fn test_companies_deduplicate_by_name_city_and_country() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    app.create_contact(&session, &[("firstName", "A"), ("lastName", "One"), ("email", "a@example.com"), ("companyName", "Acme"), ("companyCity", "Austin")])
        .await;
    app.create_contact(&session, &[("firstName", "B"), ("lastName", "Two"), ("email", "b@example.com"), ("companyName", "acme"), ("city", "Austin")])
        .await;
    assert_eq!(app.count("companies").await, 1);

    app.create_contact(&session, &[("firstName", "C"), ("lastName", "Three"), ("email", "c@example.com"), ("companyName", "Acme"), ("companyCity", "Denver")])
        .await;
    assert_eq!(app.count("companies").await, 2);

    let (_, companies) = app.get(&session, "/api/v1/companies/options").await;
    assert_eq!(companies.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_contact_validation_detail_and_delete() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    let (status, body) = app
        .post_form(&session, "/api/v1/contacts", &[("firstName", ""), ("lastName", "Doe"), ("email", "bad")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["fieldErrors"]["firstName"], "First name is required");
    assert_eq!(body["fieldErrors"]["email"], "Enter a valid email");

    let (_, body) = app
        .post_form(&session, "/api/v1/contacts", &[("id", "999"), ("firstName", "Ghost"), ("lastName", "User")])
        .await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Contact not found");

    let id = app
        .create_contact(&session, &[("firstName", "Ada"), ("lastName", "Lovelace"), ("email", "ada@example.com"), ("companyName", "Analytical")])
        .await;
    let (status, contact) = app.get(&session, &format!("/api/v1/contacts/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contact["firstName"], "Ada");
    assert_eq!(contact["company"]["name"], "Analytical");

    let (_, body) = app.post_form(&session, "/api/v1/contacts/delete", &[("id", "abc")]).await;
    assert_eq!(body["message"], "Invalid identifier");
    let (_, body) = app.post_form(&session, "/api/v1/contacts/delete", &[("id", "-4")]).await;
    assert_eq!(body["message"], "Invalid identifier");

    let id_str = id.to_string();
    let (_, body) = app.post_form(&session, "/api/v1/contacts/delete", &[("id", id_str.as_str())]).await;
    assert_eq!(body["status"], "success");
    let (_, body) = app.post_form(&session, "/api/v1/contacts/delete", &[("id", id_str.as_str())]).await;
    assert_eq!(body["message"], "Contact not found");

    let (status, _) = app.get(&session, &format!("/api/v1/contacts/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_reflects_writes_after_cached_read() {
    let app = TestApp::new().await;
    let session = app.register_admin_and_login("admin@example.com").await;

    let (_, before) = app.get(&session, "/api/v1/contacts").await;
    assert!(ids(&before).is_empty());

    let id = app
        .create_contact(&session, &[("firstName", "Ada"), ("lastName", "Lovelace"), ("email", "ada@example.com")])
        .await;

    let (_, after) = app.get(&session, "/api/v1/contacts").await;
    assert_eq!(ids(&after), vec![id]);
    assert!(after["contacts"][0]["opportunities"].as_array().unwrap().is_empty());

    let contact = id.to_string();
    let opportunity_id = app
        .create_opportunity(&session, &[("title", "Deal"), ("contactId", contact.as_str())])
        .await;
    let (_, body) = app.get(&session, "/api/v1/contacts").await;
    assert_eq!(body["contacts"][0]["opportunities"][0]["title"], "Deal");

    let opportunity = opportunity_id.to_string();
    let activity_id = app
        .create_activity(&session, &[("subject", "Intro call"), ("contactId", contact.as_str()), ("opportunityId", opportunity.as_str())])
        .await;
    let (_, pipeline) = app.get(&session, "/api/v1/opportunities").await;
    assert_eq!(pipeline["pipeline"]["NEW"][0]["activities"][0]["subject"], "Intro call");
    let (_, activities) = app.get(&session, "/api/v1/activities").await;
    assert_eq!(activities["activities"][0]["contact"]["firstName"], "Ada");

    app.post_form(&session, "/api/v1/contacts", &[
        ("id", contact.as_str()),
        ("firstName", "Augusta"),
        ("lastName", "Lovelace"),
        ("email", "ada@example.com"),
    ])
    .await;
    let (_, pipeline) = app.get(&session, "/api/v1/opportunities").await;
    assert_eq!(pipeline["pipeline"]["NEW"][0]["contact"]["firstName"], "Augusta");
    let (_, activities) = app.get(&session, "/api/v1/activities").await;
    assert_eq!(activities["activities"][0]["contact"]["firstName"], "Augusta");

    let activity = activity_id.to_string();
    app.post_form(&session, "/api/v1/activities/delete", &[("id", activity.as_str())]).await;
    let (_, body) = app.get(&session, "/api/v1/contacts").await;
    assert!(body["contacts"][0]["activities"].as_array().unwrap().is_empty());
    let (_, pipeline) = app.get(&session, "/api/v1/opportunities").await;
    assert!(pipeline["pipeline"]["NEW"][0]["activities"].as_array().unwrap().is_empty());

    app.post_form(&session, "/api/v1/opportunities/delete", &[("id", opportunity.as_str())]).await;
    let (_, body) = app.get(&session, "/api/v1/contacts").await;
    assert!(body["contacts"][0]["opportunities"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_overlong_search_is_bad_request() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    let query = "x".repeat(201);
    let (status, body) = app.get(&session, &format!("/api/v1/contacts?query={}", query)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("query"));
}

#[tokio::test]
async fn test_directory_lists() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    app.create_contact(&session, &[("firstName", "A"), ("lastName", "One"), ("email", "a@example.com"), ("companyName", "Acme"), ("tags", "vip, Lead")])
        .await;

    let (status, tags) = app.get(&session, "/api/v1/tags").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = tags.as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Lead", "vip"]);
    assert!(tags[0]["color"].as_str().unwrap().starts_with('#'));

    let (_, companies) = app.get(&session, "/api/v1/companies").await;
    assert_eq!(companies[0]["name"], "Acme");

    let (_, members) = app.get(&session, "/api/v1/team-members").await;
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["email"], "owner@example.com");
}

#[tokio::test]
async fn test_search_and_dedup_fold_accented_letters() {
    let app = TestApp::new().await;
    let session = app.register_and_login("owner@example.com").await;

    let angela = app
        .create_contact(&session, &[
            ("firstName", "ÁNGELA"),
            ("lastName", "Muñoz"),
            ("email", "angela@example.com"),
            ("companyName", "Éxito Digital"),
            ("tags", "Élite"),
            ("tags", "élite"),
        ])
        .await;
    app.create_contact(&session, &[("firstName", "B"), ("lastName", "Two"), ("email", "b@example.com"), ("companyName", "éxito digital")])
        .await;

    assert_eq!(app.count("tags").await, 1);
    assert_eq!(app.count("contact_tags").await, 1);
    assert_eq!(app.count("companies").await, 1);

    let (_, body) = app.get(&session, "/api/v1/contacts?query=%C3%A1ngela").await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(ids(&body), vec![angela]);

    let (_, body) = app.get(&session, "/api/v1/contacts?query=MU%C3%91OZ").await;
    assert_eq!(ids(&body), vec![angela]);

    let (_, body) = app.get(&session, "/api/v1/contacts?query=%C3%89LITE").await;
    assert_eq!(ids(&body), vec![angela]);

    let (_, body) = app.get(&session, "/api/v1/contacts?query=%C3%89XITO").await;
    assert_eq!(body["pagination"]["total"], 2);
}
