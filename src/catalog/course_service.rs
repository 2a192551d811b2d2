//! Course Service
//!
//! CRUD over courses. Listing goes through the pagination engine.

use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::models::COURSE_COLUMNS;
use crate::domain::{Course, CoursePatch, DomainError, Price};
use crate::error::AppResult;
use crate::pagination::{paginate, Filter, ListQuery, Page, PageRequest};
use crate::projection;
use crate::storage::{remove_best_effort, BlobKind, BlobStore, Upload};

/// Columns searched by the course listing
const COURSE_SEARCH_COLUMNS: &[&str] =
    &["title", "instructor", "array_to_string(topics, ' ')"];

/// Input for a new course
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub topics: Vec<String>,
    pub price: Price,
}

/// A course with its live module count
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub total_modules: i64,
}

#[derive(Clone)]
pub struct CourseService {
    pool: PgPool,
    blobs: Arc<dyn BlobStore>,
}

impl CourseService {
    pub fn new(pool: PgPool, blobs: Arc<dyn BlobStore>) -> Self {
        Self { pool, blobs }
    }

    pub async fn create(&self, input: NewCourse, thumbnail: Option<Upload>) -> AppResult<Course> {
        if input.title.trim().is_empty() {
            return Err(DomainError::invalid_input("title is required").into());
        }

        let thumbnail_path = match thumbnail {
            Some(upload) => Some(self.blobs.put(BlobKind::Image, &upload).await?),
            None => None,
        };

        let result = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, description, instructor, topics, price, thumbnail_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.instructor)
        .bind(&input.topics)
        .bind(input.price.value())
        .bind(&thumbnail_path)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(course) => {
                tracing::info!(course_id = %course.id, "Course created");
                Ok(course)
            }
            Err(e) => {
                remove_best_effort(self.blobs.as_ref(), thumbnail_path.as_deref()).await;
                Err(e.into())
            }
        }
    }

    /// Load a live course
    pub async fn find(&self, id: Uuid) -> AppResult<Course> {
        let course: Option<Course> = sqlx::query_as(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        course.ok_or_else(|| DomainError::CourseNotFound(id).into())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<CourseDetail> {
        let course = self.find(id).await?;
        let total_modules = projection::count_live_modules(&self.pool, id).await?;
        Ok(CourseDetail {
            course,
            total_modules,
        })
    }

    pub async fn list(&self, request: PageRequest, search: &str) -> AppResult<Page<Course>> {
        let query = ListQuery::new(COURSE_COLUMNS, "courses")
            .filter(Filter::live("deleted_at"))
            .order_by("created_at ASC, id ASC")
            .searchable(COURSE_SEARCH_COLUMNS);

        Ok(paginate(&self.pool, &query, request, search).await?)
    }

    /// Apply a partial update.
    ///
    /// A new thumbnail replaces the old one; `clear_thumbnail` drops it.
    /// The previous file is removed only after the row is committed.
    pub async fn update(
        &self,
        id: Uuid,
        mut patch: CoursePatch,
        thumbnail: Option<Upload>,
        clear_thumbnail: bool,
    ) -> AppResult<Course> {
        if patch.is_empty() && thumbnail.is_none() && !clear_thumbnail {
            return Err(DomainError::invalid_input("no fields to update provided").into());
        }
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            return Err(DomainError::invalid_input("title must not be blank").into());
        }

        let mut tx = self.pool.begin().await?;

        let mut course: Course = sqlx::query_as(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DomainError::CourseNotFound(id))?;

        let previous_thumbnail = course.thumbnail_path.clone();

        if let Some(upload) = thumbnail {
            patch.thumbnail_path = Some(Some(self.blobs.put(BlobKind::Image, &upload).await?));
        } else if clear_thumbnail {
            patch.thumbnail_path = Some(None);
        }
        patch.apply(&mut course);

        let updated = sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses
            SET title = $2, description = $3, instructor = $4, topics = $5,
                price = $6, thumbnail_path = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.instructor)
        .bind(&course.topics)
        .bind(course.price)
        .bind(&course.thumbnail_path)
        .fetch_one(&mut *tx)
        .await;

        let committed = match updated {
            Ok(updated) => tx.commit().await.map(|_| updated),
            Err(e) => Err(e),
        };

        let new_thumbnail = patch.thumbnail_path.flatten();
        match committed {
            Ok(updated) => {
                if previous_thumbnail != updated.thumbnail_path {
                    remove_best_effort(self.blobs.as_ref(), previous_thumbnail.as_deref()).await;
                }
                tracing::info!(course_id = %id, "Course updated");
                Ok(updated)
            }
            Err(e) => {
                remove_best_effort(self.blobs.as_ref(), new_thumbnail.as_deref()).await;
                Err(e.into())
            }
        }
    }

    /// Soft delete. Enrollments and progress rows are kept.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let thumbnail: Option<Option<String>> = sqlx::query_scalar(
            r#"
            UPDATE courses SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING thumbnail_path
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let thumbnail = thumbnail.ok_or(DomainError::CourseNotFound(id))?;
        remove_best_effort(self.blobs.as_ref(), thumbnail.as_deref()).await;

        tracing::info!(course_id = %id, "Course deleted");
        Ok(())
    }
}
