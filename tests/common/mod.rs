#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use contacts_api::config::AppConfig;
use contacts_api::services::FixedClock;
use contacts_api::{app, AppState};

/// The date every test server believes it is
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 28).unwrap()
}

/// In-process server over the memory backend
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::in_memory(AppConfig::for_tests(), Arc::new(FixedClock(today())));
        Self {
            router: app(state.clone()),
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<TestResponse> {
        let body = json!({ "username": username, "email": email, "password": password });
        self.request(Method::POST, "/api/auth/signup", None, Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TestResponse> {
        let form = format!("username={}&password={}", email.replace('@', "%40"), password);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))?;
        self.send(request).await
    }

    /// Signup + login; returns (access_token, refresh_token)
    pub async fn register(&self, email: &str) -> Result<(String, String)> {
        let res = self.signup("tester", email, "secret123").await?;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {}", res.body);
        let res = self.login(email, "secret123").await?;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
        let access = res.data()["access_token"].as_str().unwrap_or_default().to_string();
        let refresh = res.data()["refresh_token"].as_str().unwrap_or_default().to_string();
        Ok((access, refresh))
    }

    pub async fn create_contact(&self, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, "/api/contacts/", Some(token), Some(body)).await
    }
}

pub fn contact(name: &str, surname: &str, email: &str, birthday: &str) -> Value {
    json!({
        "name": name,
        "surname": surname,
        "email": email,
        "phone": "555-0100",
        "birthday": birthday,
    })
}

pub fn names(res: &TestResponse) -> Vec<String> {
    res.data()
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
