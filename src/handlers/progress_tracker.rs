//! Progress Tracker
//!
//! Per-user module completion and the course aggregate derived from it.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::models::MODULE_COLUMNS;
use crate::domain::{CourseProgress, DomainError, Module, OperationContext};
use crate::error::AppResult;
use crate::pagination::{paginate, Filter, ListQuery, PageRequest, Pagination};
use crate::projection;

use super::{CompletionResult, SetCompletionCommand};

/// Columns searched by the module listing
const MODULE_SEARCH_COLUMNS: &[&str] = &["title", "description"];

/// Display order within a course; ties broken by age then id
const MODULE_ORDER_BY: &str = r#""order" ASC, created_at ASC, id ASC"#;

/// A page of modules with the requesting user's completion flags
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleListing {
    pub modules: Vec<Module>,
    pub completion: HashMap<Uuid, bool>,
    pub pagination: Pagination,
}

impl ModuleListing {
    /// A module without a progress row counts as not completed.
    pub fn is_completed(&self, module_id: Uuid) -> bool {
        self.completion.get(&module_id).copied().unwrap_or(false)
    }

    /// Modules paired with their flag, in listing order.
    pub fn entries(&self) -> Vec<ModuleEntry<'_>> {
        self.modules
            .iter()
            .map(|module| ModuleEntry {
                module,
                is_completed: self.is_completed(module.id),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleEntry<'a> {
    #[serde(flatten)]
    pub module: &'a Module,
    pub is_completed: bool,
}

/// Handler for completion writes and progress reads
#[derive(Clone)]
pub struct ProgressTracker {
    pool: PgPool,
}

impl ProgressTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the completion flag and recompute the course aggregate.
    ///
    /// Write and recount share one transaction, so the returned figures
    /// always include this write. Un-completing clears `completed_at`.
    pub async fn set_completion(
        &self,
        command: SetCompletionCommand,
        context: &OperationContext,
    ) -> AppResult<CompletionResult> {
        let SetCompletionCommand {
            module_id,
            user_id,
            is_completed,
        } = command;

        let mut tx = self.pool.begin().await?;

        let course_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT course_id FROM modules WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(module_id)
        .fetch_optional(&mut *tx)
        .await?;
        let course_id = course_id.ok_or(DomainError::ModuleNotFound(module_id))?;

        let user_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if !user_exists {
            return Err(DomainError::UserNotFound(user_id).into());
        }

        sqlx::query(
            r#"
            INSERT INTO module_progress (user_id, module_id, is_completed, completed_at)
            VALUES ($1, $2, $3, CASE WHEN $3 THEN NOW() END)
            ON CONFLICT (user_id, module_id) DO UPDATE
            SET is_completed = EXCLUDED.is_completed,
                completed_at = EXCLUDED.completed_at,
                deleted_at = NULL,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(module_id)
        .bind(is_completed)
        .execute(&mut *tx)
        .await?;

        let course_progress = projection::course_progress(&mut *tx, user_id, course_id).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            module_id = %module_id,
            course_id = %course_id,
            is_completed = is_completed,
            completed = course_progress.completed_modules,
            total = course_progress.total_modules,
            correlation_id = ?context.correlation_id,
            "Module completion updated"
        );

        Ok(CompletionResult {
            module_id,
            is_completed,
            course_progress,
        })
    }

    /// Modules of a course in display order, with the user's flags.
    pub async fn list_modules(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        request: PageRequest,
        search: &str,
    ) -> AppResult<ModuleListing> {
        let course_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        if !course_exists {
            return Err(DomainError::CourseNotFound(course_id).into());
        }

        let query = ListQuery::new(MODULE_COLUMNS, "modules")
            .filter(Filter::eq_uuid("course_id", course_id))
            .filter(Filter::live("deleted_at"))
            .order_by(MODULE_ORDER_BY)
            .searchable(MODULE_SEARCH_COLUMNS);

        let page = paginate::<Module>(&self.pool, &query, request, search).await?;

        let module_ids: Vec<Uuid> = page.records.iter().map(|m| m.id).collect();
        let completion = projection::completion_flags(&self.pool, user_id, &module_ids).await?;

        Ok(ModuleListing {
            modules: page.records,
            completion,
            pagination: page.pagination,
        })
    }

    /// Read-only progress of a user in a course.
    pub async fn course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<CourseProgress> {
        let course_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        if !course_exists {
            return Err(DomainError::CourseNotFound(course_id).into());
        }

        Ok(projection::course_progress(&self.pool, user_id, course_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn module(order: i32) -> Module {
        let now = Utc::now();
        Module {
            id: Uuid::new_v4(),
            course_id: Uuid::nil(),
            title: format!("Module {order}"),
            description: String::new(),
            order,
            pdf_path: None,
            video_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_set_completion_command_defaults_to_completed() {
        let cmd = SetCompletionCommand::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(cmd.is_completed);
        assert!(!cmd.with_completed(false).is_completed);
    }

    #[test]
    fn test_missing_progress_row_reads_as_not_completed() {
        let done = module(1);
        let pending = module(2);
        let listing = ModuleListing {
            completion: HashMap::from([(done.id, true)]),
            modules: vec![done.clone(), pending.clone()],
            pagination: Pagination {
                current_page: 1,
                total_pages: 1,
                total_items: 2,
            },
        };

        assert!(listing.is_completed(done.id));
        assert!(!listing.is_completed(pending.id));

        let entries = listing.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].module.id, done.id);
        assert!(!entries[1].is_completed);
    }

    #[test]
    fn test_module_entry_flattens_module_fields() {
        let m = module(3);
        let entry = ModuleEntry {
            module: &m,
            is_completed: true,
        };
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["order"], 3);
        assert_eq!(json["is_completed"], true);
    }
}
