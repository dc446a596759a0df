#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use cleanops_api::crypto::{self, DataKey};
use cleanops_api::db::{self as dbq, companies::CompanyExtras, users::NewUser};
use cleanops_api::service::CompanyFields;
use cleanops_api::{
    ApprovalStatus, SignupType, SubscriptionPlan, SubscriptionStatus, UserRole,
};
use cleanops_server::storage::{Db, init_in_memory, sq_execute};
use cleanops_server::{AppConfig, AppState, app};

pub const PASSWORD: &str = "cleanpass1";

/// Router plus a handle on its database for seeding.
pub struct TestApp {
    pub router: Router,
    pub db: Db,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let db = init_in_memory().expect("in-memory database");
        let config = AppConfig {
            base_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret".into(),
            data_key: DataKey::derive("test"),
        };
        let router = app(
            AppState {
                db: db.clone(),
                config,
            },
            None,
        );
        Self { router, db }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Reply {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// POST with no body and no `Content-Type`.
    pub async fn post_empty(&self, uri: &str, token: Option<&str>) -> Reply {
        self.request(Method::POST, uri, token, None).await
    }

    /// Raw SQL against the app's database, for states the API cannot reach directly.
    pub fn exec(&self, sql: &str, params: impl rusqlite::Params) -> usize {
        self.db.conn().execute(sql, params).unwrap()
    }

    /// Company on the given plan with no trial end.
    pub fn seed_company(&self, name: &str, plan: SubscriptionPlan) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let fields = CompanyFields {
            name: Some(name.into()),
            plan: Some(plan),
            status: Some(SubscriptionStatus::Active),
            basic_units: Some(3),
            premium_units: Some(0),
        };
        let conn = self.db.conn();
        sq_execute(
            &conn,
            dbq::companies::insert(&id, name, &fields, &CompanyExtras::default()),
        )
        .unwrap();
        id
    }

    /// Insert a user directly; returns the user id.
    pub fn seed_user(
        &self,
        email: &str,
        role: UserRole,
        company_id: &str,
        approval_status: ApprovalStatus,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let (hash, salt) = crypto::hash_password(PASSWORD).unwrap();
        let conn = self.db.conn();
        sq_execute(
            &conn,
            dbq::users::insert(&NewUser {
                id: &id,
                email,
                password_hash: &hash,
                password_salt: &salt,
                name: email.split('@').next().unwrap_or(email),
                phone: None,
                role,
                company_id,
                approval_status,
                signup_type: SignupType::CompanyCode,
            }),
        )
        .unwrap();
        id
    }

    pub async fn login(&self, email: &str) -> String {
        let reply = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "login {email}: {}", reply.body);
        reply.body["access_token"].as_str().unwrap().to_string()
    }

    /// Seed an approved user and log them in.
    pub async fn user_with_token(
        &self,
        email: &str,
        role: UserRole,
        company_id: &str,
    ) -> (String, String) {
        let id = self.seed_user(email, role, company_id, ApprovalStatus::Approved);
        let token = self.login(email).await;
        (id, token)
    }

    /// Owner creates a store and assigns `user_ids` to it.
    pub async fn store_with_staff(&self, owner_token: &str, name: &str, user_ids: &[&str]) -> String {
        let reply = self
            .post(
                "/api/business/stores",
                Some(owner_token),
                serde_json::json!({ "name": name, "address": "1 Main St" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        let store_id = reply.body["data"]["id"].as_str().unwrap().to_string();

        let reply = self
            .put(
                &format!("/api/business/stores/{store_id}/users"),
                Some(owner_token),
                serde_json::json!({ "user_ids": user_ids }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        store_id
    }
}

pub fn gps() -> Value {
    serde_json::json!({ "lat": 37.5665, "lng": 126.9780, "accuracy": 10.0 })
}
