use bootcamp_mailer::domain::campaign::{CampaignStatus, RecipientGroup};
use reqwest::Method;
use serde_json::Value;
use wiremock::{
    matchers::{any, body_partial_json, method, path},
    Mock, Request, Respond, ResponseTemplate,
};

use crate::helper::{campaign_body, spawn_app};

/// Rejects every recipient whose address starts with `bounce`.
struct BounceResponder;

impl Respond for BounceResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        match body["To"].as_str() {
            Some(to) if to.starts_with("bounce") => ResponseTemplate::new(422),
            _ => ResponseTemplate::new(200),
        }
    }
}

#[tokio::test]
async fn newsletter_campaign_reaches_every_subscriber() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 120);
    app.add_subscribers(RecipientGroup::WaitingList, "waiting", 5);
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);

    Mock::given(path("/email"))
        .and(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "From": "Bootcamp Team <hello@bootcamp.dev>",
            "Subject": "Cohort 12 starts on Monday",
            "HtmlBody": "<h1>Welcome aboard</h1>",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(120)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_campaign(&campaign_body(campaign_id, "newsletter"))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "sent");
    assert_eq!(body["sentCount"], 120);
    assert_eq!(body["failedCount"], 0);
    assert_eq!(body["totalRecipients"], 120);

    let campaign = app.campaign(campaign_id);
    assert_eq!(campaign.status, CampaignStatus::Sent);
    assert_eq!(campaign.sent_count, 120);
    assert!(campaign.sent_at.is_some());
}

#[tokio::test]
async fn an_empty_list_is_rejected_and_fails_the_campaign() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 3);
    let campaign_id = app.draft_campaign(RecipientGroup::WaitingList);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_campaign(&campaign_body(campaign_id, "waiting_list"))
        .await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "error": "No recipients found" }));
    assert_eq!(app.campaign(campaign_id).status, CampaignStatus::Failed);
}

#[tokio::test]
async fn some_bounces_still_send_the_campaign() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 7);
    app.add_subscribers(RecipientGroup::Newsletter, "bounce", 3);
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);

    Mock::given(path("/email"))
        .respond_with(BounceResponder)
        .expect(10)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_campaign(&campaign_body(campaign_id, "newsletter"))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["sentCount"], 7);
    assert_eq!(body["failedCount"], 3);
    assert_eq!(body["totalRecipients"], 10);

    let campaign = app.campaign(campaign_id);
    assert_eq!(campaign.status, CampaignStatus::Sent);
    assert_eq!(campaign.sent_count, 7);
}

#[tokio::test]
async fn a_campaign_where_every_send_fails_answers_200_with_a_failed_status() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "bounce", 10);
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);

    Mock::given(path("/email"))
        .respond_with(BounceResponder)
        .expect(10)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_campaign(&campaign_body(campaign_id, "newsletter"))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["sentCount"], 0);
    assert_eq!(body["failedCount"], 10);
    assert_eq!(app.campaign(campaign_id).status, CampaignStatus::Failed);
}

#[tokio::test]
async fn an_unknown_recipient_group_has_no_recipients() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 3);
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app.post_campaign(&campaign_body(campaign_id, "alumni")).await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(app.campaign(campaign_id).status, CampaignStatus::Failed);
}

#[tokio::test]
async fn a_campaign_already_being_sent_is_not_sent_again() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 3);
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);
    let mut campaign = app.campaign(campaign_id);
    campaign.status = CampaignStatus::Sending;
    app.store.insert_campaign(campaign).unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_campaign(&campaign_body(campaign_id, "newsletter"))
        .await;

    assert_eq!(409, response.status().as_u16());
    assert_eq!(app.campaign(campaign_id).status, CampaignStatus::Sending);
}

#[tokio::test]
async fn an_unknown_campaign_returns_404() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 3);

    let response = app
        .post_campaign(&campaign_body(uuid::Uuid::new_v4(), "newsletter"))
        .await;

    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn sending_a_campaign_twice_emails_everybody_twice() {
    // Finished campaigns can be sent again; nothing deduplicates the second send.
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 4);
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(8)
        .mount(&app.email_server)
        .await;

    for _ in 0..2 {
        let response = app
            .post_campaign(&campaign_body(campaign_id, "newsletter"))
            .await;
        assert_eq!(200, response.status().as_u16());
    }
}

#[tokio::test]
async fn send_returns_a_422_when_fields_are_missing() {
    let app = spawn_app().await;
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);

    for field in [
        "campaignId",
        "title",
        "subject",
        "content",
        "recipientGroup",
        "fromEmail",
        "fromName",
    ] {
        let mut body = campaign_body(campaign_id, "newsletter");
        body.as_object_mut().unwrap().remove(field);

        let response = app.post_campaign(&body).await;

        assert_eq!(
            422,
            response.status().as_u16(),
            "The API did not fail with 422 when the payload was missing {}",
            field
        );
    }

    assert_eq!(app.campaign(campaign_id).status, CampaignStatus::Draft);
}

#[tokio::test]
async fn send_returns_a_400_when_fields_are_present_but_invalid() {
    let app = spawn_app().await;
    app.add_subscribers(RecipientGroup::Newsletter, "student", 3);
    let campaign_id = app.draft_campaign(RecipientGroup::Newsletter);
    let test_cases = [
        ("fromEmail", "definitely-not-an-email", "invalid sender email"),
        ("fromName", "", "empty sender name"),
        ("subject", "Hello\r\nBcc: all@bootcamp.dev", "multi-line subject"),
        ("content", "   ", "blank content"),
        ("title", "", "empty title"),
    ];

    for (field, value, description) in test_cases {
        let mut body = campaign_body(campaign_id, "newsletter");
        body[field] = Value::String(value.to_string());

        let response = app.post_campaign(&body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request when the payload had an {}.",
            description
        );
    }

    assert_eq!(app.campaign(campaign_id).status, CampaignStatus::Draft);
}

#[tokio::test]
async fn preflight_requests_are_accepted_from_any_origin() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, format!("{}/send-marketing-email", app.addr))
        .header("Origin", "https://admin.bootcamp.dev")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "authorization,apikey,content-type")
        .send()
        .await
        .expect("The request should succeed.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        Some("*"),
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok())
    );
}

#[tokio::test]
async fn a_bare_options_request_gets_an_empty_success() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, format!("{}/send-marketing-email", app.addr))
        .send()
        .await
        .expect("The request should succeed.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(Some(0), response.content_length());
}
