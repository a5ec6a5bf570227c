//! Drive the REST router end to end with `tower::ServiceExt::oneshot`.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use recipes::contract::model::User;
use recipes::domain::repo::RecipesRepository;

async fn send(router: &Router, req: Request<Body>) -> Response {
    router.clone().oneshot(req).await.expect("router is infallible")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(resp: &Response) -> &str {
    resp.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// A user with an issued token, bypassing the password flow.
async fn authed(ctx: &TestCtx, username: &str) -> (User, String) {
    let user = user(ctx, username).await;
    let token = ctx
        .repo()
        .insert_token(&format!("token-{username}"), user.id)
        .await
        .unwrap();
    (user, token)
}

#[tokio::test]
async fn register_login_and_me() {
    let ctx = setup().await;
    let router = ctx.router();

    let resp = send(
        &router,
        request(
            Method::POST,
            "/api/users",
            None,
            Some(json!({
                "email": "vpupkin@yandex.ru",
                "username": "vasya.pupkin",
                "first_name": "Vasya",
                "last_name": "Pupkin",
                "password": "Qwerty123"
            })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["username"], "vasya.pupkin");
    assert!(created.get("password").is_none());

    let resp = send(
        &router,
        request(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({"email": "vpupkin@yandex.ru", "password": "Qwerty123"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = body_json(resp).await["auth_token"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = send(&router, request(Method::GET, "/api/users/me", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = body_json(resp).await;
    assert_eq!(me["id"], created["id"]);
    assert_eq!(me["is_subscribed"], false);

    let resp = send(
        &router,
        request(Method::POST, "/api/auth/token/logout", Some(&token), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&router, request(Method::GET, "/api/users/me", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_or_bad_credentials_are_problems() {
    let ctx = setup().await;
    let router = ctx.router();

    let resp = send(&router, request(Method::GET, "/api/users/me", None, None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(content_type(&resp), "application/problem+json");
    let problem = body_json(resp).await;
    assert_eq!(problem["code"], "AUTH_REQUIRED");
    assert_eq!(problem["instance"], "/api/users/me");

    // an unknown token is rejected even where auth is optional
    let resp = send(&router, request(Method::GET, "/api/recipes", Some("nope"), None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &router,
        request(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({"email": "ghost@example.com", "password": "whatever1"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_recipe_and_read_it_back() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let (_, token) = authed(&ctx, "chef").await;
    let router = ctx.router();

    let resp = send(
        &router,
        request(
            Method::POST,
            "/api/recipes",
            Some(&token),
            Some(json!({
                "ingredients": [
                    {"id": cat.flour.id, "amount": 200},
                    {"id": cat.milk.id, "amount": 300}
                ],
                "tags": [cat.breakfast.id],
                "image": PNG_DATA_URI,
                "name": "Pancakes",
                "text": "Mix and fry",
                "cooking_time": 15
            })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["author"]["username"], "chef");
    assert_eq!(created["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(created["tags"][0]["slug"], "breakfast");
    let image_url = created["image_url"].as_str().unwrap();
    assert!(image_url.starts_with("/media/"), "{image_url}");

    let id = created["id"].as_i64().unwrap();
    let resp = send(&router, request(Method::GET, &format!("/api/recipes/{id}"), None, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = body_json(resp).await;
    assert_eq!(fetched["name"], "Pancakes");
    assert_eq!(fetched["is_favorited"], false);

    // the stored image is served under the media prefix
    let resp = send(&router, request(Method::GET, image_url, None, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_bodies_and_references_are_bad_requests() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let (_, token) = authed(&ctx, "chef").await;
    let router = ctx.router();

    let resp = send(
        &router,
        request(
            Method::POST,
            "/api/recipes",
            Some(&token),
            Some(json!({"name": "No fields"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(content_type(&resp), "application/problem+json");

    let resp = send(
        &router,
        request(
            Method::POST,
            "/api/recipes",
            Some(&token),
            Some(json!({
                "ingredients": [{"id": 999, "amount": 1}],
                "tags": [cat.dinner.id],
                "image": PNG_DATA_URI,
                "name": "Ghost",
                "text": "Boo",
                "cooking_time": 5
            })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let problem = body_json(resp).await;
    assert_eq!(problem["code"], "RECIPES_REFERENCE_NOT_FOUND");

    let resp = send(
        &router,
        request(Method::GET, "/api/recipes?is_favorited=maybe", None, None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recipe_list_pages_and_filters() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let (chef, _) = authed(&ctx, "chef").await;
    for (name, tag) in [
        ("One", cat.breakfast.id),
        ("Two", cat.dinner.id),
        ("Three", cat.breakfast.id),
    ] {
        recipe(&ctx, &chef, name, &[(cat.flour.id, 1)], &[tag]).await;
    }
    let router = ctx.router();

    let resp = send(&router, request(Method::GET, "/api/recipes?limit=2", None, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_json(resp).await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(page["results"][0]["name"], "Three");
    assert_eq!(page["next"], "/api/recipes?limit=2&page=2");
    assert!(page["previous"].is_null());

    let resp = send(
        &router,
        request(Method::GET, "/api/recipes?tags=breakfast&tags=dinner", None, None),
    )
    .await;
    assert_eq!(body_json(resp).await["count"], 3);

    let resp = send(&router, request(Method::GET, "/api/recipes?tags=dinner", None, None)).await;
    let page = body_json(resp).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["name"], "Two");

    let resp = send(&router, request(Method::GET, "/api/recipes?page=5", None, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn huge_pages_and_preview_limits_are_handled() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let (chef, _) = authed(&ctx, "chef").await;
    let (_, token) = authed(&ctx, "fan").await;
    for name in ["A", "B"] {
        recipe(&ctx, &chef, name, &[(cat.flour.id, 1)], &[cat.dinner.id]).await;
    }
    let router = ctx.router();

    for page in ["18446744073709551615", "9223372036854775807", "2000000000000000000"] {
        let uri = format!("/api/recipes?page={page}");
        let resp = send(&router, request(Method::GET, &uri, None, None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "page={page}");
        assert_eq!(body_json(resp).await["code"], "PAGE_NOT_FOUND");
    }

    let resp = send(
        &router,
        request(
            Method::POST,
            &format!("/api/users/{}/subscribe", chef.id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &router,
        request(
            Method::GET,
            "/api/users/subscriptions?recipes_limit=18446744073709551615",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_json(resp).await;
    assert_eq!(page["results"][0]["recipes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn favorites_cart_and_shopping_list_download() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let (chef, _) = authed(&ctx, "chef").await;
    let (_, token) = authed(&ctx, "fan").await;
    let r = recipe(&ctx, &chef, "Porridge", &[(cat.milk.id, 250)], &[cat.breakfast.id]).await;
    let router = ctx.router();
    let favorite = format!("/api/recipes/{}/favorite", r.recipe.id);
    let cart = format!("/api/recipes/{}/shopping_cart", r.recipe.id);

    let resp = send(&router, request(Method::POST, &favorite, Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let short = body_json(resp).await;
    assert_eq!(short["name"], "Porridge");
    assert!(short.get("text").is_none());

    let resp = send(&router, request(Method::POST, &favorite, Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(content_type(&resp), "application/problem+json");
    assert_eq!(body_json(resp).await["code"], "ALREADY_EXISTS");

    let resp = send(&router, request(Method::POST, &cart, Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &router,
        request(
            Method::GET,
            "/api/recipes?is_favorited=1&is_in_shopping_cart=1",
            Some(&token),
            None,
        ),
    )
    .await;
    let page = body_json(resp).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["is_favorited"], true);
    assert_eq!(page["results"][0]["is_in_shopping_cart"], true);

    let resp = send(
        &router,
        request(
            Method::GET,
            "/api/recipes/download_shopping_cart",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(content_type(&resp).starts_with("text/plain"));
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"shop_list.txt\"");
    assert!(body_text(resp).await.contains("milk - 250 ml."));

    let resp = send(&router, request(Method::DELETE, &cart, Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&router, request(Method::DELETE, &favorite, Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let (chef, chef_token) = authed(&ctx, "chef").await;
    let (_, other_token) = authed(&ctx, "other").await;
    let r = recipe(&ctx, &chef, "Soup", &[(cat.milk.id, 1)], &[cat.dinner.id]).await;
    let router = ctx.router();
    let path = format!("/api/recipes/{}", r.recipe.id);
    let update = json!({
        "ingredients": [{"id": cat.flour.id, "amount": 3}],
        "tags": [cat.breakfast.id],
        "name": "Better soup",
        "text": "Stir",
        "cooking_time": 20
    });

    let resp = send(
        &router,
        request(Method::PATCH, &path, Some(&other_token), Some(update.clone())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["code"], "FORBIDDEN");

    let resp = send(&router, request(Method::PATCH, &path, None, Some(update.clone()))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &router,
        request(Method::PATCH, &path, Some(&chef_token), Some(update)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["name"], "Better soup");
    assert_eq!(updated["ingredients"][0]["amount"], 3);
    assert_eq!(updated["tags"][0]["slug"], "breakfast");

    let resp = send(&router, request(Method::DELETE, &path, Some(&other_token), None)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send(&router, request(Method::DELETE, &path, Some(&chef_token), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&router, request(Method::GET, &path, None, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let problem = body_json(resp).await;
    assert_eq!(problem["code"], "RECIPES_NOT_FOUND");
    assert_eq!(problem["status"], 404);
}

#[tokio::test]
async fn subscriptions_over_http() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let (chef, _) = authed(&ctx, "chef").await;
    let (fan, token) = authed(&ctx, "fan").await;
    for name in ["A", "B", "C"] {
        recipe(&ctx, &chef, name, &[(cat.flour.id, 1)], &[cat.dinner.id]).await;
    }
    let router = ctx.router();

    let resp = send(
        &router,
        request(
            Method::POST,
            &format!("/api/users/{}/subscribe?recipes_limit=1", chef.id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let sub = body_json(resp).await;
    assert_eq!(sub["is_subscribed"], true);
    assert_eq!(sub["recipes_count"], 3);
    assert_eq!(sub["recipes"].as_array().unwrap().len(), 1);

    let resp = send(
        &router,
        request(
            Method::POST,
            &format!("/api/users/{}/subscribe", fan.id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
        &router,
        request(Method::GET, "/api/users/subscriptions", Some(&token), None),
    )
    .await;
    let page = body_json(resp).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], "chef");

    let resp = send(
        &router,
        request(Method::GET, &format!("/api/users/{}", chef.id), Some(&token), None),
    )
    .await;
    assert_eq!(body_json(resp).await["is_subscribed"], true);

    let resp = send(
        &router,
        request(
            Method::DELETE,
            &format!("/api/users/{}/subscribe", chef.id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn catalogue_endpoints() {
    let ctx = setup().await;
    let cat = catalogue(&ctx).await;
    let router = ctx.router();

    let resp = send(&router, request(Method::GET, "/api/tags", None, None)).await;
    let tags = body_json(resp).await;
    assert_eq!(tags.as_array().unwrap().len(), 2);
    assert_eq!(tags[0]["color"], "#E26C2D");

    let resp = send(
        &router,
        request(Method::GET, &format!("/api/tags/{}", cat.dinner.id), None, None),
    )
    .await;
    assert_eq!(body_json(resp).await["slug"], "dinner");

    let resp = send(&router, request(Method::GET, "/api/ingredients?name=mi", None, None)).await;
    let items = body_json(resp).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["measurement_unit"], "ml");

    let resp = send(&router, request(Method::GET, "/api/ingredients/999", None, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], "INGREDIENTS_NOT_FOUND");

    let resp = send(&router, request(Method::GET, "/api/tags/abc", None, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
