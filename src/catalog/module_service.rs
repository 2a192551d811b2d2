//! Module Service
//!
//! CRUD over course modules plus the all-or-nothing reorder.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::models::MODULE_COLUMNS;
use crate::domain::{DomainError, Module, ModulePatch};
use crate::error::{AppError, AppResult};
use crate::storage::{remove_best_effort, BlobKind, BlobStore, Upload};

/// Input for a new module
#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub description: String,
    pub order: i32,
}

/// Content uploads accompanying a create or update
#[derive(Debug, Clone, Default)]
pub struct ModuleContent {
    pub pdf: Option<Upload>,
    pub video: Option<Upload>,
    pub clear_pdf: bool,
    pub clear_video: bool,
}

impl ModuleContent {
    fn is_empty(&self) -> bool {
        self.pdf.is_none() && self.video.is_none() && !self.clear_pdf && !self.clear_video
    }
}

/// One entry of a reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOrder {
    pub id: Uuid,
    pub order: i32,
}

#[derive(Clone)]
pub struct ModuleService {
    pool: PgPool,
    blobs: Arc<dyn BlobStore>,
}

impl ModuleService {
    pub fn new(pool: PgPool, blobs: Arc<dyn BlobStore>) -> Self {
        Self { pool, blobs }
    }

    pub async fn create(
        &self,
        course_id: Uuid,
        input: NewModule,
        content: ModuleContent,
    ) -> AppResult<Module> {
        if input.title.trim().is_empty() {
            return Err(DomainError::invalid_input("title is required").into());
        }
        if input.order < 0 {
            return Err(DomainError::invalid_input("order must not be negative").into());
        }

        let mut tx = self.pool.begin().await?;
        lock_live_course(&mut tx, course_id).await?;

        let stored = self.store_content(&content).await?;

        let result = sqlx::query_as::<_, Module>(&format!(
            r#"
            INSERT INTO modules (course_id, title, description, "order", pdf_path, video_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MODULE_COLUMNS}
            "#
        ))
        .bind(course_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.order)
        .bind(&stored.pdf)
        .bind(&stored.video)
        .fetch_one(&mut *tx)
        .await;

        let committed = match result {
            Ok(module) => tx.commit().await.map(|_| module),
            Err(e) => Err(e),
        };

        match committed {
            Ok(module) => {
                tracing::info!(module_id = %module.id, course_id = %course_id, "Module created");
                Ok(module)
            }
            Err(e) => {
                self.discard(&stored).await;
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Module> {
        let module: Option<Module> = sqlx::query_as(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        module.ok_or_else(|| DomainError::ModuleNotFound(id).into())
    }

    pub async fn update(
        &self,
        id: Uuid,
        mut patch: ModulePatch,
        content: ModuleContent,
    ) -> AppResult<Module> {
        if patch.is_empty() && content.is_empty() {
            return Err(DomainError::invalid_input("no fields to update provided").into());
        }
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            return Err(DomainError::invalid_input("title must not be blank").into());
        }

        let mut tx = self.pool.begin().await?;

        let mut module: Module = sqlx::query_as(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DomainError::ModuleNotFound(id))?;

        let previous = StoredContent {
            pdf: module.pdf_path.clone(),
            video: module.video_path.clone(),
        };

        let stored = self.store_content(&content).await?;
        if stored.pdf.is_some() {
            patch.pdf_path = Some(stored.pdf.clone());
        } else if content.clear_pdf {
            patch.pdf_path = Some(None);
        }
        if stored.video.is_some() {
            patch.video_path = Some(stored.video.clone());
        } else if content.clear_video {
            patch.video_path = Some(None);
        }
        patch.apply(&mut module);

        let result = sqlx::query_as::<_, Module>(&format!(
            r#"
            UPDATE modules
            SET title = $2, description = $3, pdf_path = $4, video_path = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {MODULE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&module.title)
        .bind(&module.description)
        .bind(&module.pdf_path)
        .bind(&module.video_path)
        .fetch_one(&mut *tx)
        .await;

        let committed = match result {
            Ok(updated) => tx.commit().await.map(|_| updated),
            Err(e) => Err(e),
        };

        match committed {
            Ok(updated) => {
                if previous.pdf != updated.pdf_path {
                    remove_best_effort(self.blobs.as_ref(), previous.pdf.as_deref()).await;
                }
                if previous.video != updated.video_path {
                    remove_best_effort(self.blobs.as_ref(), previous.video.as_deref()).await;
                }
                tracing::info!(module_id = %id, "Module updated");
                Ok(updated)
            }
            Err(e) => {
                self.discard(&stored).await;
                Err(e.into())
            }
        }
    }

    /// Soft delete. Progress rows for the module stay but stop counting.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let paths: Option<(Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            UPDATE modules SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING pdf_path, video_path
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let (pdf, video) = paths.ok_or(DomainError::ModuleNotFound(id))?;
        self.discard(&StoredContent { pdf, video }).await;

        tracing::info!(module_id = %id, "Module deleted");
        Ok(())
    }

    /// Assign new display orders to a batch of modules of one course.
    ///
    /// Every id must belong to the live course; otherwise nothing is written.
    /// Duplicate ids or duplicate order values within the batch are rejected.
    pub async fn reorder(&self, course_id: Uuid, orders: &[ModuleOrder]) -> AppResult<()> {
        validate_reorder(orders)?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let positions: Vec<i32> = orders.iter().map(|o| o.order).collect();

        let mut tx = self.pool.begin().await?;
        lock_live_course(&mut tx, course_id).await?;

        let owned: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM modules
            WHERE id = ANY($1) AND course_id = $2 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .bind(course_id)
        .fetch_all(&mut *tx)
        .await?;

        if owned.len() != ids.len() {
            return Err(DomainError::invalid_input(
                "some module IDs do not belong to the specified course or are invalid",
            )
            .into());
        }

        sqlx::query(
            r#"
            UPDATE modules AS m
            SET "order" = v.position, updated_at = NOW()
            FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, position)
            WHERE m.id = v.id
            "#,
        )
        .bind(&ids)
        .bind(&positions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(course_id = %course_id, modules = ids.len(), "Modules reordered");
        Ok(())
    }

    async fn store_content(&self, content: &ModuleContent) -> AppResult<StoredContent> {
        let pdf = match &content.pdf {
            Some(upload) => Some(self.blobs.put(BlobKind::Pdf, upload).await?),
            None => None,
        };
        let video = match &content.video {
            Some(upload) => match self.blobs.put(BlobKind::Video, upload).await {
                Ok(path) => Some(path),
                Err(e) => {
                    remove_best_effort(self.blobs.as_ref(), pdf.as_deref()).await;
                    return Err(e.into());
                }
            },
            None => None,
        };
        Ok(StoredContent { pdf, video })
    }

    async fn discard(&self, stored: &StoredContent) {
        remove_best_effort(self.blobs.as_ref(), stored.pdf.as_deref()).await;
        remove_best_effort(self.blobs.as_ref(), stored.video.as_deref()).await;
    }
}

struct StoredContent {
    pdf: Option<String>,
    video: Option<String>,
}

/// Take a share lock on a live course so it cannot be deleted mid-write.
async fn lock_live_course(
    tx: &mut Transaction<'_, Postgres>,
    course_id: Uuid,
) -> Result<(), AppError> {
    let found: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM courses WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
    )
    .bind(course_id)
    .fetch_optional(&mut **tx)
    .await?;

    found
        .map(|_| ())
        .ok_or_else(|| DomainError::CourseNotFound(course_id).into())
}

fn validate_reorder(orders: &[ModuleOrder]) -> Result<(), DomainError> {
    if orders.is_empty() {
        return Err(DomainError::invalid_input("module_order must not be empty"));
    }

    let mut ids = HashSet::with_capacity(orders.len());
    let mut positions = HashSet::with_capacity(orders.len());
    for entry in orders {
        if entry.order < 0 {
            return Err(DomainError::invalid_input(format!(
                "order for module {} must not be negative",
                entry.id
            )));
        }
        if !ids.insert(entry.id) {
            return Err(DomainError::invalid_input(format!(
                "module {} appears more than once",
                entry.id
            )));
        }
        if !positions.insert(entry.order) {
            return Err(DomainError::invalid_input(format!(
                "order {} is assigned to more than one module",
                entry.order
            )));
        }
    }
    Ok(())
}
