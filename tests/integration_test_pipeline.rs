mod common;

use axum::http::StatusCode;
use common::TestApp;

async fn seed_pipeline(app: &TestApp, session: &common::Session) {
    for i in 0..5 {
        let title = format!("New deal {}", i);
        app.create_opportunity(session, &[("title", title.as_str())]).await;
    }
    app.create_opportunity(session, &[("title", "Big win"), ("status", "WON"), ("value", "1,000.50")]).await;
    app.create_opportunity(session, &[("title", "Small win"), ("status", "won"), ("value", "250")]).await;
}

#[tokio::test]
async fn test_pipeline_counts_ignore_page_size() {
    let app = TestApp::new().await;
    let session = app.register_admin_and_login("admin@example.com").await;
    seed_pipeline(&app, &session).await;

    let (status, body) = app.get(&session, "/api/v1/opportunities").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"]["NEW"], 5);
    assert_eq!(body["counts"]["WON"], 2);
    assert_eq!(body["counts"]["IN_PROGRESS"], 0);
    assert_eq!(body["counts"]["LOST"], 0);
    assert_eq!(body["pipeline"]["NEW"].as_array().unwrap().len(), 3);
    assert_eq!(body["pipeline"]["WON"].as_array().unwrap().len(), 2);
    assert!(body["pipeline"]["LOST"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["total"], 7);
    assert_eq!(body["pagination"]["totalPages"], 1);
    assert!(body["activeStatus"].is_null());

    let (_, narrow) = app.get(&session, "/api/v1/opportunities?pageSize=1&page=4").await;
    assert_eq!(narrow["counts"], body["counts"]);
    assert_eq!(narrow["pipeline"]["NEW"].as_array().unwrap().len(), 1);
    assert_eq!(narrow["pagination"]["page"], 1);
}

#[tokio::test]
async fn test_status_filter_paginates_one_bucket() {
    let app = TestApp::new().await;
    let session = app.register_admin_and_login("admin@example.com").await;
    seed_pipeline(&app, &session).await;

    let (status, body) = app.get(&session, "/api/v1/opportunities?status=new&pageSize=2&page=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activeStatus"], "NEW");
    assert_eq!(body["pipeline"]["NEW"].as_array().unwrap().len(), 1);
    assert!(body["pipeline"]["WON"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["counts"]["WON"], 2);

    // Most recently updated first.
    let (_, first) = app.get(&session, "/api/v1/opportunities?status=NEW").await;
    assert_eq!(first["pipeline"]["NEW"][0]["title"], "New deal 4");
    assert_eq!(first["pagination"]["pageSize"], 12);
}

#[tokio::test]
async fn test_dashboard_totals_use_decimal_sums() {
    let app = TestApp::new().await;
    let session = app.register_admin_and_login("admin@example.com").await;
    seed_pipeline(&app, &session).await;

    let (status, body) = app.get(&session, "/api/v1/dashboard").await;
    assert_eq!(status, StatusCode::OK);

    let totals = body["pipelineTotals"].as_array().unwrap();
    let statuses: Vec<&str> = totals.iter().map(|t| t["status"].as_str().unwrap()).collect();
    assert_eq!(statuses, vec!["NEW", "IN_PROGRESS", "WON", "LOST"]);
    assert_eq!(totals[0]["count"], 5);
    assert_eq!(totals[0]["value"], "0");
    assert_eq!(totals[2]["count"], 2);
    assert_eq!(totals[2]["value"], "1250.5");
}

#[tokio::test]
async fn test_opportunity_detail_includes_recent_activities() {
    let app = TestApp::new().await;
    let session = app.register_admin_and_login("admin@example.com").await;

    let contact_id = app
        .create_contact(&session, &[("firstName", "Ada"), ("lastName", "Lovelace"), ("email", "ada@example.com")])
        .await;
    let contact = contact_id.to_string();
    let opportunity_id = app
        .create_opportunity(&session, &[("title", "Engine"), ("contactId", contact.as_str()), ("status", "in progress")])
        .await;
    let opportunity = opportunity_id.to_string();

    for i in 0..6 {
        let subject = format!("Follow up {}", i);
        app.create_activity(&session, &[
            ("subject", subject.as_str()),
            ("opportunityId", opportunity.as_str()),
            ("contactId", contact.as_str()),
        ])
        .await;
    }

    let (status, body) = app.get(&session, &format!("/api/v1/opportunities/{}", opportunity_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_PROGRESS");
    assert_eq!(body["contact"]["firstName"], "Ada");
    let activities = body["activities"].as_array().unwrap();
    assert_eq!(activities.len(), 5);
    assert_eq!(activities[0]["subject"], "Follow up 5");
    assert_eq!(activities[0]["contact"]["email"], "ada@example.com");

    let (_, pipeline) = app.get(&session, "/api/v1/opportunities").await;
    let card = &pipeline["pipeline"]["IN_PROGRESS"][0];
    assert_eq!(card["activities"].as_array().unwrap().len(), 2);

    let (status, _) = app.get(&session, "/api/v1/opportunities/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_members_only_see_their_own_pipeline() {
    let app = TestApp::new().await;
    let admin = app.register_admin_and_login("admin@example.com").await;
    let member = app.register_and_login("rep@example.com").await;
    let member_id = app.team_member_id(&member).await.to_string();

    app.create_opportunity(&admin, &[("title", "Mine"), ("ownerId", member_id.as_str())]).await;
    app.create_opportunity(&admin, &[("title", "Unassigned")]).await;

    let (_, mine) = app.get(&member, "/api/v1/opportunities").await;
    assert_eq!(mine["counts"]["NEW"], 1);
    assert_eq!(mine["pipeline"]["NEW"][0]["title"], "Mine");
    assert_eq!(mine["pipeline"]["NEW"][0]["owner"]["email"], "rep@example.com");

    let (_, all) = app.get(&admin, "/api/v1/opportunities").await;
    assert_eq!(all["counts"]["NEW"], 2);
}

#[tokio::test]
async fn test_opportunity_save_and_delete_messages() {
    let app = TestApp::new().await;
    let session = app.register_admin_and_login("admin@example.com").await;

    let (_, body) = app.post_form(&session, "/api/v1/opportunities", &[("title", ""), ("value", "lots")]).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["fieldErrors"]["title"], "Title is required");
    assert_eq!(body["fieldErrors"]["value"], "Invalid amount");

    let id = app.create_opportunity(&session, &[("title", "Deal")]).await;
    let id_str = id.to_string();
    let (_, body) = app
        .post_form(&session, "/api/v1/opportunities", &[("id", id_str.as_str()), ("title", "Deal"), ("status", "LOST")])
        .await;
    assert_eq!(body["message"], "Opportunity updated");

    let (_, options) = app.get(&session, "/api/v1/opportunities/options").await;
    assert_eq!(options[0]["status"], "LOST");

    let (_, body) = app.post_form(&session, "/api/v1/opportunities/delete", &[("id", id_str.as_str())]).await;
    assert_eq!(body["status"], "success");
    let (_, body) = app.post_form(&session, "/api/v1/opportunities/delete", &[("id", id_str.as_str())]).await;
    assert_eq!(body["message"], "Opportunity not found");
}
