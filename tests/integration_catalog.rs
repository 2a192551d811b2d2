//! Catalog and pagination integration tests

use rust_decimal_macros::dec;
use uuid::Uuid;

use grocademy::catalog::{CourseService, ModuleContent, ModuleOrder, ModuleService, UserService};
use grocademy::domain::{CoursePatch, Credit, DomainError, Price, UserPatch};
use grocademy::handlers::ProgressTracker;
use grocademy::pagination::PageRequest;
use grocademy::storage::Upload;
use grocademy::AppError;

mod common;

async fn seed_courses(pool: &sqlx::PgPool, token: &str, count: usize) {
    for i in 0..count {
        common::create_course(pool, &format!("{token} course {i:02}"), dec!(10)).await;
    }
}

#[tokio::test]
async fn test_page_zero_is_first_page() {
    let pool = common::setup_test_db().await;
    let token = common::unique("pg");
    seed_courses(&pool, &token, 25).await;
    let courses = CourseService::new(pool.clone(), common::blob_store());

    let zero = courses
        .list(PageRequest::new(0, 10).unwrap(), &token)
        .await
        .unwrap();
    let one = courses
        .list(PageRequest::new(1, 10).unwrap(), &token)
        .await
        .unwrap();

    assert_eq!(zero.pagination.current_page, 1);
    assert_eq!(zero.pagination.total_pages, 3);
    assert_eq!(zero.pagination.total_items, 25);
    assert_eq!(zero.records.len(), 10);
    assert_eq!(zero, one);
}

#[tokio::test]
async fn test_page_past_the_end_is_clamped() {
    let pool = common::setup_test_db().await;
    let token = common::unique("pg");
    seed_courses(&pool, &token, 25).await;
    let courses = CourseService::new(pool.clone(), common::blob_store());

    let page = courses
        .list(PageRequest::new(1000, 10).unwrap(), &token)
        .await
        .unwrap();

    assert_eq!(page.pagination.current_page, 3);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.records.len(), 5);
}

#[tokio::test]
async fn test_windows_cover_every_row_once() {
    let pool = common::setup_test_db().await;
    let token = common::unique("pg");
    seed_courses(&pool, &token, 25).await;
    let courses = CourseService::new(pool.clone(), common::blob_store());

    let mut seen = Vec::new();
    for page in 1..=3 {
        let window = courses
            .list(PageRequest::new(page, 10).unwrap(), &token)
            .await
            .unwrap();
        seen.extend(window.records.into_iter().map(|c| c.id));
    }
    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();

    assert_eq!(seen.len(), 25);
    assert_eq!(unique.len(), 25);
}

#[tokio::test]
async fn test_last_page_agrees_with_totals_under_concurrent_inserts() {
    let pool = common::setup_test_db().await;
    let token = common::unique("snap");
    seed_courses(&pool, &token, 3).await;
    let courses = CourseService::new(pool.clone(), common::blob_store());

    let writer = tokio::spawn({
        let pool = pool.clone();
        let token = token.clone();
        async move {
            for i in 0..40 {
                common::create_course(&pool, &format!("{token} late {i:02}"), dec!(1)).await;
            }
        }
    });

    for _ in 0..40 {
        let page = courses
            .list(PageRequest::new(1000, 7).unwrap(), &token)
            .await
            .unwrap();
        let expected = page.pagination.total_items - (page.pagination.total_pages - 1) * 7;
        assert_eq!(page.records.len() as i64, expected, "{:?}", page.pagination);
    }

    writer.await.unwrap();
}

#[tokio::test]
async fn test_search_without_match() {
    let pool = common::setup_test_db().await;
    let courses = CourseService::new(pool.clone(), common::blob_store());

    let page = courses
        .list(PageRequest::default(), &common::unique("nothing-matches-"))
        .await
        .unwrap();

    assert!(page.records.is_empty());
    assert_eq!(page.pagination.total_items, 0);
    assert_eq!(page.pagination.total_pages, 0);
    assert_eq!(page.pagination.current_page, 1);
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_literal() {
    let pool = common::setup_test_db().await;
    let token = common::unique("CaSe");
    common::create_course(&pool, &format!("{token} 100% off"), dec!(5)).await;
    common::create_course(&pool, &format!("{token} 1000 off"), dec!(5)).await;
    let courses = CourseService::new(pool.clone(), common::blob_store());

    let lower = courses
        .list(PageRequest::default(), &token.to_lowercase())
        .await
        .unwrap();
    assert_eq!(lower.pagination.total_items, 2);

    // '%' matches itself, not any run of characters
    let percent = courses
        .list(PageRequest::default(), &format!("{token} 100%"))
        .await
        .unwrap();
    assert_eq!(percent.pagination.total_items, 1);
}

#[tokio::test]
async fn test_course_update_and_soft_delete() {
    let pool = common::setup_test_db().await;
    let courses = CourseService::new(pool.clone(), common::blob_store());
    let course = common::create_course(&pool, &common::unique("Patch "), dec!(20)).await;

    let updated = courses
        .update(
            course.id,
            CoursePatch {
                price: Some(Price::new(dec!(35.5)).unwrap()),
                ..CoursePatch::default()
            },
            Some(Upload::new("cover.png", vec![1, 2, 3])),
            false,
        )
        .await
        .unwrap();
    assert_eq!(updated.title, course.title);
    assert_eq!(updated.price, dec!(35.5));
    let thumbnail = updated.thumbnail_path.clone().unwrap();
    assert!(std::path::Path::new(&thumbnail).exists());

    let empty = courses
        .update(course.id, CoursePatch::default(), None, false)
        .await
        .unwrap_err();
    assert!(matches!(empty, AppError::Domain(DomainError::InvalidInput(_))));

    courses.delete(course.id).await.unwrap();
    assert!(!std::path::Path::new(&thumbnail).exists());
    assert!(matches!(
        courses.get(course.id).await,
        Err(AppError::Domain(DomainError::CourseNotFound(_)))
    ));
    assert!(matches!(
        courses.delete(course.id).await,
        Err(AppError::Domain(DomainError::CourseNotFound(_)))
    ));
}

#[tokio::test]
async fn test_course_detail_counts_live_modules() {
    let pool = common::setup_test_db().await;
    let course = common::create_course(&pool, &common::unique("Detail "), dec!(0)).await;
    let modules = common::create_modules(&pool, course.id, 3).await;
    ModuleService::new(pool.clone(), common::blob_store())
        .delete(modules[2].id)
        .await
        .unwrap();

    let detail = CourseService::new(pool.clone(), common::blob_store())
        .get(course.id)
        .await
        .unwrap();
    assert_eq!(detail.total_modules, 2);
}

#[tokio::test]
async fn test_reorder_applies_whole_batch() {
    let pool = common::setup_test_db().await;
    let course = common::create_course(&pool, &common::unique("Reorder "), dec!(0)).await;
    let modules = common::create_modules(&pool, course.id, 3).await;
    let service = ModuleService::new(pool.clone(), common::blob_store());

    service
        .reorder(
            course.id,
            &[
                ModuleOrder { id: modules[0].id, order: 3 },
                ModuleOrder { id: modules[2].id, order: 1 },
            ],
        )
        .await
        .unwrap();

    let viewer = common::create_user(&pool, dec!(0)).await;
    let listing = ProgressTracker::new(pool.clone())
        .list_modules(course.id, viewer.id, PageRequest::default(), "")
        .await
        .unwrap();
    let ids: Vec<Uuid> = listing.modules.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![modules[2].id, modules[1].id, modules[0].id]);
}

#[tokio::test]
async fn test_reorder_with_foreign_module_writes_nothing() {
    let pool = common::setup_test_db().await;
    let course = common::create_course(&pool, &common::unique("Mine "), dec!(0)).await;
    let other = common::create_course(&pool, &common::unique("Theirs "), dec!(0)).await;
    let modules = common::create_modules(&pool, course.id, 2).await;
    let foreign = common::create_modules(&pool, other.id, 1).await;
    let service = ModuleService::new(pool.clone(), common::blob_store());

    let err = service
        .reorder(
            course.id,
            &[
                ModuleOrder { id: modules[0].id, order: 9 },
                ModuleOrder { id: foreign[0].id, order: 8 },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::InvalidInput(_))));

    let unchanged = service.get(modules[0].id).await.unwrap();
    assert_eq!(unchanged.order, 1);
    let untouched = service.get(foreign[0].id).await.unwrap();
    assert_eq!(untouched.order, 1);
}

#[tokio::test]
async fn test_module_content_lifecycle() {
    let pool = common::setup_test_db().await;
    let course = common::create_course(&pool, &common::unique("Content "), dec!(0)).await;
    let service = ModuleService::new(pool.clone(), common::blob_store());

    let module = service
        .create(
            course.id,
            grocademy::catalog::NewModule {
                title: "Intro".to_string(),
                description: "Slides".to_string(),
                order: 0,
            },
            ModuleContent {
                pdf: Some(Upload::new("slides.pdf", b"%PDF-1.4".to_vec())),
                ..ModuleContent::default()
            },
        )
        .await
        .unwrap();
    let pdf = module.pdf_path.clone().unwrap();
    assert!(std::path::Path::new(&pdf).exists());

    let cleared = service
        .update(
            module.id,
            Default::default(),
            ModuleContent {
                clear_pdf: true,
                ..ModuleContent::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.pdf_path.is_none());
    assert!(!std::path::Path::new(&pdf).exists());

    let missing = service
        .create(
            Uuid::new_v4(),
            grocademy::catalog::NewModule {
                title: "Orphan".to_string(),
                description: String::new(),
                order: 0,
            },
            ModuleContent::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::Domain(DomainError::CourseNotFound(_))));
}

#[tokio::test]
async fn test_user_uniqueness_and_balance() {
    let pool = common::setup_test_db().await;
    let users = UserService::new(pool.clone());
    let user = common::create_user(&pool, dec!(10)).await;
    let other = common::create_user(&pool, dec!(0)).await;

    let err = users
        .update(
            other.id,
            UserPatch {
                username: Some(user.username.clone()),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::Duplicate(_))));

    let funded = users
        .increment_balance(user.id, Credit::new(dec!(5.25)).unwrap())
        .await
        .unwrap();
    assert_eq!(funded.balance, dec!(15.25));

    users.delete(other.id).await.unwrap();
    assert!(matches!(
        users.get(other.id).await,
        Err(AppError::Domain(DomainError::UserNotFound(_)))
    ));
}

#[tokio::test]
async fn test_admin_user_is_protected() {
    let pool = common::setup_test_db().await;
    let users = UserService::new(pool.clone());
    let admin_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE username = 'admin'")
        .fetch_one(&pool)
        .await
        .unwrap();

    let update = users
        .update(
            admin_id,
            UserPatch {
                first_name: Some("Root".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(update, AppError::Domain(DomainError::ProtectedUser(_))));

    let delete = users.delete(admin_id).await.unwrap_err();
    assert!(matches!(delete, AppError::Domain(DomainError::ProtectedUser(_))));
}
