//! Enrollment Ledger
//!
//! Atomic course purchase and the "my courses" listing.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::unique_violation;
use crate::domain::{Balance, DomainError, EnrolledCourse, OperationContext, Price};
use crate::error::{AppError, AppResult};
use crate::pagination::{paginate, Filter, ListQuery, Page, PageRequest};
use crate::projection;

use super::{MyCourse, PurchaseCommand, PurchaseResult};

/// Constraint guarding against a second enrollment for the same pair
const ENROLLMENT_UNIQUE_CONSTRAINT: &str = "uq_enrollments_user_course";

const ENROLLED_COURSE_COLUMNS: &str = "c.id, c.title, c.description, c.instructor, c.topics, \
     c.price, c.thumbnail_path, c.created_at, c.updated_at, \
     e.id AS enrollment_id, e.purchased_at";

const ENROLLED_COURSE_FROM: &str = "enrollments e JOIN courses c ON c.id = e.course_id";

/// Same search surface as the course catalog, qualified for the join
const ENROLLED_COURSE_SEARCH_COLUMNS: &[&str] =
    &["c.title", "c.instructor", "array_to_string(c.topics, ' ')"];

/// Handler for purchases and enrollment reads
#[derive(Clone)]
pub struct EnrollmentLedger {
    pool: PgPool,
}

impl EnrollmentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Debit the course price and record the enrollment, all or nothing.
    ///
    /// The user row is locked before anything else is checked, so two
    /// purchases by one user are serialized and the later one observes the
    /// earlier enrollment. The unique constraint on (user, course) stays as
    /// the backstop. Rejections carry the unmodified balance.
    pub async fn purchase(
        &self,
        command: PurchaseCommand,
        context: &OperationContext,
    ) -> AppResult<PurchaseResult> {
        let PurchaseCommand { user_id, course_id } = command;

        let mut tx = self.pool.begin().await?;

        let price: Option<Decimal> = sqlx::query_scalar(
            "SELECT price FROM courses WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;
        let price = price.ok_or(DomainError::CourseNotFound(course_id))?;
        let price = Price::new(price).map_err(|e| AppError::Internal(e.to_string()))?;

        let balance: Option<Decimal> = sqlx::query_scalar(
            "SELECT balance FROM users WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let balance = balance.ok_or(DomainError::UserNotFound(user_id))?;
        let balance = Balance::new(balance).map_err(|e| AppError::Internal(e.to_string()))?;

        let enrolled: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM enrollments
                WHERE user_id = $1 AND course_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;
        if enrolled {
            tracing::warn!(
                user_id = %user_id,
                course_id = %course_id,
                correlation_id = ?context.correlation_id,
                "Purchase rejected: already enrolled"
            );
            return Err(DomainError::already_enrolled(course_id, balance.value()).into());
        }

        let Some(new_balance) = balance.debit(&price) else {
            tracing::warn!(
                user_id = %user_id,
                course_id = %course_id,
                price = %price,
                balance = %balance,
                correlation_id = ?context.correlation_id,
                "Purchase rejected: insufficient balance"
            );
            return Err(DomainError::insufficient_balance(price.value(), balance.value()).into());
        };

        sqlx::query("UPDATE users SET balance = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(new_balance.value())
            .execute(&mut *tx)
            .await?;

        let transaction_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO enrollments (user_id, course_id, price_paid)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(price.value())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) if constraint == ENROLLMENT_UNIQUE_CONSTRAINT => {
                tracing::warn!(
                    user_id = %user_id,
                    course_id = %course_id,
                    correlation_id = ?context.correlation_id,
                    "Purchase lost a concurrent race, rolling back"
                );
                AppError::from(DomainError::already_enrolled(course_id, balance.value()))
            }
            _ => AppError::Database(e),
        })?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            course_id = %course_id,
            transaction_id = %transaction_id,
            price = %price,
            balance = %new_balance,
            correlation_id = ?context.correlation_id,
            "Course purchased"
        );

        Ok(PurchaseResult {
            balance: new_balance.value(),
            transaction_id,
        })
    }

    /// The user's live enrollments in live courses, newest first, each with
    /// its progress percentage.
    pub async fn list_my_courses(
        &self,
        user_id: Uuid,
        request: PageRequest,
        search: &str,
    ) -> AppResult<Page<MyCourse>> {
        let query = ListQuery::new(ENROLLED_COURSE_COLUMNS, ENROLLED_COURSE_FROM)
            .filter(Filter::eq_uuid("e.user_id", user_id))
            .filter(Filter::live("e.deleted_at"))
            .filter(Filter::live("c.deleted_at"))
            .order_by("e.purchased_at DESC, e.id DESC")
            .searchable(ENROLLED_COURSE_SEARCH_COLUMNS);

        let page: Page<EnrolledCourse> = paginate(&self.pool, &query, request, search).await?;

        let course_ids: Vec<Uuid> = page.records.iter().map(|r| r.course.id).collect();
        let progress = projection::progress_by_course(&self.pool, user_id, &course_ids).await?;

        Ok(page.map(|enrollment| {
            let progress_percentage = progress
                .get(&enrollment.course.id)
                .map(|p| p.percentage)
                .unwrap_or(0.0);
            MyCourse {
                enrollment,
                progress_percentage,
            }
        }))
    }
}
