mod common;

use actix_web::{test, web, App};
use serde_json::{json, Value};
use vivu_server::{promo, routes, Settings};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.state.clone()))
                .configure(routes::configure),
        )
        .await
    };
}

macro_rules! register {
    ($app:expr, $email:expr) => {{
        let body: Value = test::call_and_read_body_json(&$app, common::register_request($email).to_request()).await;
        body["token"].as_str().unwrap().to_string()
    }};
}

async fn search_count(ctx: &common::TestApp, email: &str) -> i32 {
    use vivu_server::db::Store;
    ctx.store.get_user_by_email(email).await.unwrap().unwrap().search_count
}

#[actix_web::test]
async fn test_search_requires_auth() {
    let ctx = common::test_app();
    let app = init_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/api/travel/search")
        .set_json(json!({ "query": "Đà Lạt 3 ngày" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_trial_search_then_subscription_required() {
    let ctx = common::test_app();
    let app = init_app!(ctx);
    let token = register!(app, "lan@vivu.com");

    let resp = common::search_request(&token, "Đà Lạt 3 ngày").send_request(&app).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["travelInfo"], common::ITINERARY);
    assert!(uuid::Uuid::parse_str(body["threadId"].as_str().unwrap()).is_ok());
    assert_eq!(
        body["usage"],
        json!({ "searchCount": 1, "trialUsed": true, "subscriptionActive": false })
    );

    let resp = common::search_request(&token, "Hội An").send_request(&app).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Subscription required");
    assert_eq!(body["subscriptionStatus"], "free");

    // A denied search is not counted.
    assert_eq!(search_count(&ctx, "lan@vivu.com").await, 1);
}

#[actix_web::test]
async fn test_simultaneous_searches_spend_trial_once() {
    let ctx = common::yielding_test_app();
    let app = init_app!(ctx);
    let token = register!(app, "lan@vivu.com");

    let (first, second) = futures::join!(
        test::call_service(&app, common::search_request(&token, "Đà Lạt").to_request()),
        test::call_service(&app, common::search_request(&token, "Hội An").to_request()),
    );

    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 403]);
    assert_eq!(search_count(&ctx, "lan@vivu.com").await, 1);
}

#[actix_web::test]
async fn test_blank_query_rejected_without_counting() {
    let ctx = common::test_app();
    let app = init_app!(ctx);
    let token = register!(app, "lan@vivu.com");

    let resp = common::search_request(&token, "   ").send_request(&app).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("Query is required"));

    assert_eq!(search_count(&ctx, "lan@vivu.com").await, 0);

    // The trial is still available.
    let resp = common::search_request(&token, "Sa Pa").send_request(&app).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_promo_unlocks_search_after_trial() {
    let ctx = common::test_app();
    promo::seed_default(ctx.store.as_ref()).await.unwrap();
    let app = init_app!(ctx);
    let token = register!(app, "lan@vivu.com");

    let resp = common::search_request(&token, "Huế").send_request(&app).await;
    assert_eq!(resp.status(), 200);

    let resp = test::TestRequest::get().uri("/api/promo/validate/vivuvuvi").send_request(&app).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "valid": true, "kind": "lifetime", "durationMonths": 999 }));

    let resp = common::authorized(test::TestRequest::post().uri("/api/promo/redeem"), &token)
        .set_json(json!({ "code": "vivuvuvi" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["subscription"]["type"], "lifetime");
    assert_eq!(body["user"]["subscription"]["active"], true);
    assert_eq!(body["user"]["subscription"]["endDate"], Value::Null);

    let resp = common::authorized(test::TestRequest::post().uri("/api/promo/redeem"), &token)
        .set_json(json!({ "code": "VIVUVUVI" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 409);

    let resp = common::search_request(&token, "Phú Quốc").send_request(&app).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["usage"],
        json!({ "searchCount": 2, "trialUsed": true, "subscriptionActive": true })
    );
}

#[actix_web::test]
async fn test_unknown_promo_code() {
    let ctx = common::test_app();
    let app = init_app!(ctx);
    let token = register!(app, "lan@vivu.com");

    let resp = test::TestRequest::get().uri("/api/promo/validate/NOPE").send_request(&app).await;
    assert_eq!(resp.status(), 404);

    let resp = common::authorized(test::TestRequest::post().uri("/api/promo/redeem"), &token)
        .set_json(json!({ "code": "NOPE" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_send_email_flow() {
    let ctx = common::test_app();
    let app = init_app!(ctx);
    let owner = register!(app, "lan@vivu.com");
    let stranger = register!(app, "minh@vivu.com");

    let body: Value = test::call_and_read_body_json(&app, common::search_request(&owner, "Đà Lạt").to_request()).await;
    let thread_id = body["threadId"].as_str().unwrap().to_string();

    let email = |token: &str, thread: &str| {
        common::authorized(test::TestRequest::post().uri("/api/travel/send-email"), token).set_json(json!({
            "senderEmail": "lan@vivu.com",
            "receiverEmail": "friend@example.com",
            "subject": "Chuyến đi Đà Lạt",
            "threadId": thread,
        }))
    };

    let resp = common::authorized(test::TestRequest::post().uri("/api/travel/send-email"), &owner)
        .set_json(json!({ "senderEmail": "lan@vivu.com", "threadId": thread_id }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);

    let resp = email(&owner, &uuid::Uuid::new_v4().to_string()).send_request(&app).await;
    assert_eq!(resp.status(), 404);

    let resp = email(&stranger, &thread_id).send_request(&app).await;
    assert_eq!(resp.status(), 403);

    let resp = email(&owner, &thread_id).send_request(&app).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Email sent successfully");

    {
        let sent = ctx.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "friend@example.com");
        assert_eq!(sent[0].reply_to, "lan@vivu.com");
        assert!(sent[0].html.contains(common::ITINERARY));
    }

    // The session is gone once emailed.
    let resp = email(&owner, &thread_id).send_request(&app).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_mailer_failure_keeps_session() {
    let ctx = common::test_app_with(
        Settings::new_for_test().unwrap(),
        common::RecordingMailer { fail: true, ..Default::default() },
    );
    let app = init_app!(ctx);
    let token = register!(app, "lan@vivu.com");

    let body: Value = test::call_and_read_body_json(&app, common::search_request(&token, "Đà Lạt").to_request()).await;
    let thread_id = body["threadId"].as_str().unwrap().to_string();

    let resp = common::authorized(test::TestRequest::post().uri("/api/travel/send-email"), &token)
        .set_json(json!({
            "senderEmail": "lan@vivu.com",
            "receiverEmail": "friend@example.com",
            "subject": "Đà Lạt",
            "threadId": thread_id,
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("Failed to send email"));

    let thread = uuid::Uuid::parse_str(&thread_id).unwrap();
    assert!(ctx.state.sessions.get(&thread).await.is_some());
}

#[actix_web::test]
async fn test_search_rate_limit_per_client() {
    let ctx = common::test_app();
    let app = init_app!(ctx);

    for _ in 0..5 {
        let resp = test::TestRequest::post()
            .uri("/api/travel/search")
            .insert_header(("X-Forwarded-For", "203.0.113.7"))
            .set_json(json!({ "query": "Đà Lạt" }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 401);
    }

    let resp = test::TestRequest::post()
        .uri("/api/travel/search")
        .insert_header(("X-Forwarded-For", "203.0.113.7"))
        .set_json(json!({ "query": "Đà Lạt" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 429);

    let resp = test::TestRequest::post()
        .uri("/api/travel/search")
        .insert_header(("X-Forwarded-For", "198.51.100.2"))
        .set_json(json!({ "query": "Đà Lạt" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_location_routes() {
    let overpass = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&overpass)
        .await;

    let mut settings = Settings::new_for_test().unwrap();
    settings.location.overpass_url = overpass.uri();
    let ctx = common::test_app_with(settings, common::RecordingMailer::default());
    let app = init_app!(ctx);
    let token = register!(app, "lan@vivu.com");

    let resp = common::authorized(test::TestRequest::post().uri("/api/location/nearby"), &token)
        .set_json(json!({ "category": "cafe" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);

    let resp = common::authorized(test::TestRequest::post().uri("/api/location/nearby"), &token)
        .set_json(json!({ "location": { "lat": 21.0285, "lng": 105.8542 }, "category": "cafe" }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["places"][0]["name"], "Cà phê Cộng");

    let resp = test::TestRequest::post()
        .uri("/api/location/nearby")
        .set_json(json!({ "location": { "lat": 21.0, "lng": 105.8 } }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 401);

    let resp = test::TestRequest::get().uri("/api/location/photo/abc").send_request(&app).await;
    assert_eq!(resp.status(), 302);
    assert!(resp.headers().get("Location").is_some());
}
