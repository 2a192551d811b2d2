//! Common test utilities
//!
//! Tests share one database and run concurrently, so every fixture gets a
//! unique name and assertions only look at rows the test created.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use grocademy::api::middleware::hash_api_key;
use grocademy::catalog::{
    CourseService, ModuleContent, ModuleService, NewCourse, NewModule, NewUser, UserService,
};
use grocademy::db;
use grocademy::domain::{Course, Credit, Module, Price, User};
use grocademy::storage::{BlobStore, LocalBlobStore};
use grocademy::{build_router, AppState};

pub const API_KEY: &str = "test_key_123";
pub const READ_ONLY_API_KEY: &str = "test_reader_456";

/// Connect, migrate and seed the API keys used by the router tests
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    db::run_migrations(&pool).await.expect("Failed to run migrations");
    db::ensure_default_admin(&pool, Decimal::new(9_999_999_999, 0))
        .await
        .expect("Failed to seed admin");

    for (name, key, prefix, permissions) in [
        ("Test Key", API_KEY, "test_", vec!["admin".to_string()]),
        ("Reader Key", READ_ONLY_API_KEY, "read_", vec!["read".to_string()]),
    ] {
        sqlx::query(
            r#"
            INSERT INTO api_keys (name, key_hash, key_prefix, permissions, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(name)
        .bind(hash_api_key(key))
        .bind(prefix)
        .bind(permissions)
        .execute(&pool)
        .await
        .expect("Failed to seed API key");
    }

    pool
}

pub fn blob_store() -> Arc<dyn BlobStore> {
    let root = std::env::temp_dir().join(format!("grocademy-test-{}", Uuid::new_v4()));
    Arc::new(LocalBlobStore::new(root))
}

pub fn app_state(pool: &PgPool) -> AppState {
    AppState::new(pool.clone(), blob_store())
}

pub fn app(pool: &PgPool) -> axum::Router {
    build_router(app_state(pool))
}

/// A string no other test will produce
pub fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple())
}

pub async fn create_user(pool: &PgPool, balance: Decimal) -> User {
    let users = UserService::new(pool.clone());
    let name = unique("user_");
    let user = users
        .create(NewUser {
            username: name.clone(),
            email: format!("{name}@example.com"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        })
        .await
        .expect("Failed to create user");

    if balance > Decimal::ZERO {
        users
            .increment_balance(user.id, Credit::new(balance).unwrap())
            .await
            .expect("Failed to fund user")
    } else {
        user
    }
}

pub async fn create_course(pool: &PgPool, title: &str, price: Decimal) -> Course {
    CourseService::new(pool.clone(), blob_store())
        .create(
            NewCourse {
                title: title.to_string(),
                description: "A test course".to_string(),
                instructor: "Ferris".to_string(),
                topics: vec!["rust".to_string()],
                price: Price::new(price).unwrap(),
            },
            None,
        )
        .await
        .expect("Failed to create course")
}

/// Modules ordered 1..=count
pub async fn create_modules(pool: &PgPool, course_id: Uuid, count: i32) -> Vec<Module> {
    let modules = ModuleService::new(pool.clone(), blob_store());
    let mut created = Vec::new();
    for order in 1..=count {
        let module = modules
            .create(
                course_id,
                NewModule {
                    title: format!("Module {order}"),
                    description: format!("Lesson number {order}"),
                    order,
                },
                ModuleContent::default(),
            )
            .await
            .expect("Failed to create module");
        created.push(module);
    }
    created
}

pub async fn balance_of(pool: &PgPool, user_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

pub async fn enrollment_count(pool: &PgPool, user_id: Uuid, course_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE user_id = $1 AND course_id = $2")
        .bind(user_id)
        .bind(course_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count enrollments")
}
