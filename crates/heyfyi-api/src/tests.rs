//! End-to-end tests driving the router against an in-memory SQLite store.

use std::sync::{Arc, Mutex};

use axum::{
  Router,
  body::Body,
  http::{HeaderMap, Method, Request, StatusCode, header},
};
use heyfyi_core::{
  notify::{Mailer, Notifier},
  store::AccountStore,
};
use heyfyi_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

const PASSWORD: &str = "testing1+";

// ─── Harness ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("unreachable")]
struct Never;

/// Keeps every sent email body.
#[derive(Clone, Default)]
struct Outbox(Arc<Mutex<Vec<String>>>);

impl Outbox {
  fn len(&self) -> usize { self.0.lock().unwrap().len() }

  /// Path of the first link in the latest email, relative to the site root.
  fn last_link_path(&self) -> String {
    let bodies = self.0.lock().unwrap();
    let body = bodies.last().expect("an email was sent");
    body
      .lines()
      .find_map(|line| line.strip_prefix("http://hey.test"))
      .expect("a link in the email")
      .to_owned()
  }
}

impl Mailer for Outbox {
  type Error = Never;

  async fn send_email<'a>(
    &'a self,
    _to: &'a str,
    _subject: &'a str,
    body: &'a str,
  ) -> Result<(), Never> {
    self.0.lock().unwrap().push(body.to_owned());
    Ok(())
  }
}

struct Harness {
  app:    Router,
  store:  Arc<SqliteStore>,
  outbox: Outbox,
}

async fn harness() -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let outbox = Outbox::default();
  let notifier = Notifier::new(outbox.clone(), "http://hey.test");
  let app = api_router(AppState::new(store.clone(), notifier));
  Harness { app, store, outbox }
}

impl Harness {
  async fn send(
    &self,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, HeaderMap, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(body) => req
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string())),
      None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = self.app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, value)
  }

  async fn sign_up(&self, email: &str) -> StatusCode {
    let body = json!({
      "email": email,
      "nickname": "nick",
      "password": PASSWORD,
      "confirm_password": PASSWORD,
      "accept_terms": true,
    });
    self.send(Method::POST, "/accounts", None, Some(body)).await.0
  }

  async fn log_in(&self, email: &str, password: &str) -> (StatusCode, HeaderMap, Value) {
    let body = json!({ "email": email, "password": password });
    self.send(Method::POST, "/session", None, Some(body)).await
  }

  /// Sign up, follow the verification link and log in. Returns the token.
  async fn verified_session(&self, email: &str) -> String {
    assert_eq!(self.sign_up(email).await, StatusCode::CREATED);
    let link = self.outbox.last_link_path();
    let (status, ..) = self.send(Method::GET, &link, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = self.log_in(email, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_owned()
  }

  async fn make_admin(&self, email: &str) {
    let mut account = self
      .store
      .load_account_by_email(email)
      .await
      .unwrap()
      .unwrap();
    account.admin = true;
    self.store.save_account(&mut account).await.unwrap();
  }
}

fn fact_body() -> Value {
  json!({
    "statement": "Water boils at 100C at sea level",
    "explain": "Standard pressure",
    "explain_further": "Boiling point depends on pressure",
    "references": [
      { "url": "example.com/water", "title": "Water", "publisher": "Example" },
      { "url": "https://example.org/boil", "title": "Boil", "publisher": "Example" },
    ],
  })
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_checks_confirmation_and_terms() {
  let h = harness().await;

  let mismatch = json!({
    "email": "a@test", "nickname": "nick",
    "password": PASSWORD, "confirm_password": "different1+",
    "accept_terms": true,
  });
  let (status, _, body) = h.send(Method::POST, "/accounts", None, Some(mismatch)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Your passwords don't match!");

  let no_terms = json!({
    "email": "a@test", "nickname": "nick",
    "password": PASSWORD, "confirm_password": PASSWORD,
  });
  let (status, ..) = h.send(Method::POST, "/accounts", None, Some(no_terms)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(h.outbox.len(), 0);

  assert_eq!(h.sign_up("a@test").await, StatusCode::CREATED);
  assert_eq!(h.outbox.len(), 1);
  assert_eq!(h.sign_up("a@test").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_requires_verification() {
  let h = harness().await;
  h.sign_up("a@test").await;

  let (status, _, body) = h.log_in("a@test", PASSWORD).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "Account not yet verified.");

  let (status, ..) = h.log_in("a@test", "wrong-pass1").await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, ..) = h.send(Method::GET, "/verify/1/not-the-code", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, ..) = h.send(Method::GET, "/verify/99/code", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_lifecycle() {
  let h = harness().await;
  let token = h.verified_session("a@test").await;

  let (status, _, me) = h.send(Method::GET, "/accounts/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["email"], "a@test");
  assert_eq!(me["vote_bank"], 10);
  assert_eq!(me["verified"], true);

  let req = Request::builder()
    .uri("/accounts/me")
    .header(header::COOKIE, format!("heyfyi_session={token}"))
    .body(Body::empty())
    .unwrap();
  let resp = h.app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);

  let (status, headers, _) = h.send(Method::DELETE, "/session", Some(&token), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let cookie = headers[header::SET_COOKIE].to_str().unwrap();
  assert!(cookie.contains("Max-Age=0"));

  let (status, ..) = h.send(Method::GET, "/accounts/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_session_cookie() {
  let h = harness().await;
  let _ = h.verified_session("a@test").await;

  let (_, headers, body) = h.log_in("a@test", PASSWORD).await;
  let cookie = headers[header::SET_COOKIE].to_str().unwrap();
  let token = body["token"].as_str().unwrap();
  assert!(cookie.starts_with(&format!("heyfyi_session={token}")));
  assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn password_reset_flow() {
  let h = harness().await;
  let _ = h.verified_session("a@test").await;
  let sent_before = h.outbox.len();

  let unknown = json!({ "email": "nobody@test" });
  let (status, ..) = h.send(Method::POST, "/reset", None, Some(unknown)).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  assert_eq!(h.outbox.len(), sent_before);

  let known = json!({ "email": "a@test" });
  let (status, ..) = h.send(Method::POST, "/reset", None, Some(known)).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  let link = h.outbox.last_link_path();
  assert!(link.starts_with("/reset/"));

  let mismatch = json!({ "password": "Another1!", "confirm_password": "Another2!" });
  let (status, ..) = h.send(Method::POST, &link, None, Some(mismatch)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let weak = json!({ "password": "short", "confirm_password": "short" });
  let (status, ..) = h.send(Method::POST, &link, None, Some(weak)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let good = json!({ "password": "Another1!", "confirm_password": "Another1!" });
  let (status, ..) = h.send(Method::POST, &link, None, Some(good.clone())).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  // The code is single-use.
  let (status, ..) = h.send(Method::POST, &link, None, Some(good)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  assert_eq!(h.log_in("a@test", PASSWORD).await.0, StatusCode::UNAUTHORIZED);
  assert_eq!(h.log_in("a@test", "Another1!").await.0, StatusCode::OK);
}

// ─── Facts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fact_moderation_gates_visibility() {
  let h = harness().await;
  let owner = h.verified_session("owner@test").await;
  let stranger = h.verified_session("stranger@test").await;
  let admin = h.verified_session("admin@test").await;
  h.make_admin("admin@test").await;

  let (status, ..) = h.send(Method::POST, "/facts", None, Some(fact_body())).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _, fact) = h.send(Method::POST, "/facts", Some(&owner), Some(fact_body())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(fact["awaiting_moderation"], true);
  assert_eq!(fact["references"][0]["url"], "http://example.com/water");
  let path = format!("/facts/{}", fact["id"]);

  let (_, _, list) = h.send(Method::GET, "/facts", None, None).await;
  assert_eq!(list.as_array().unwrap().len(), 0);
  let (_, _, list) = h.send(Method::GET, "/facts", Some(&owner), None).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  let (status, ..) = h.send(Method::GET, &path, Some(&stranger), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let clear = json!({ "awaiting_moderation": false });
  let moderate = format!("{path}/moderate");
  let (status, ..) = h
    .send(Method::POST, &moderate, Some(&owner), Some(clear.clone()))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _, moderated) = h.send(Method::POST, &moderate, Some(&admin), Some(clear)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(moderated["awaiting_moderation"], false);

  let (_, _, list) = h.send(Method::GET, "/facts", None, None).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  let (status, ..) = h.send(Method::GET, &path, Some(&stranger), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn voting_spends_and_refunds_the_bank() {
  let h = harness().await;
  let owner = h.verified_session("owner@test").await;
  let (_, _, fact) = h.send(Method::POST, "/facts", Some(&owner), Some(fact_body())).await;
  let vote = format!("/facts/{}/vote", fact["id"]);

  let (status, ..) = h.send(Method::POST, &vote, None, Some(json!({ "up": true }))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _, outcome) = h
    .send(Method::POST, &vote, Some(&owner), Some(json!({ "up": true })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome["vote_bank"], 9);
  assert_eq!(outcome["score"]["ups"], 1);
  assert_eq!(outcome["score"]["account_vote"], 1);

  let (_, _, outcome) = h
    .send(Method::POST, &vote, Some(&owner), Some(json!({ "up": false })))
    .await;
  assert_eq!(outcome["vote_bank"], 10);
  assert_eq!(outcome["score"]["account_vote"], 0);
}

#[tokio::test]
async fn only_owner_or_admin_may_delete() {
  let h = harness().await;
  let owner = h.verified_session("owner@test").await;
  let stranger = h.verified_session("stranger@test").await;
  let admin = h.verified_session("admin@test").await;
  h.make_admin("admin@test").await;

  let (_, _, fact) = h.send(Method::POST, "/facts", Some(&owner), Some(fact_body())).await;
  let path = format!("/facts/{}", fact["id"]);
  let clear = json!({ "awaiting_moderation": false });
  h.send(Method::POST, &format!("{path}/moderate"), Some(&admin), Some(clear))
    .await;

  let (status, ..) = h.send(Method::DELETE, &path, Some(&stranger), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, ..) = h.send(Method::DELETE, &path, Some(&owner), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, ..) = h.send(Method::GET, &path, Some(&admin), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
