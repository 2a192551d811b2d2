//! Filtered list queries
//!
//! SQL fragments (table, columns, ordering, searchable expressions) are
//! `'static` and chosen by the calling service. Every user-supplied value
//! goes through a bind parameter.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Page, PageRequest, PaginationError};

/// Fixed predicate applied before the search term.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, Uuid),
    IsNull(&'static str),
}

impl Filter {
    pub fn eq_uuid(column: &'static str, value: Uuid) -> Self {
        Filter::Eq(column, value)
    }

    /// Excludes soft-deleted rows of the given table alias or name.
    pub fn live(deleted_at_column: &'static str) -> Self {
        Filter::IsNull(deleted_at_column)
    }
}

/// Base query handed to [`paginate`].
#[derive(Debug, Clone)]
pub struct ListQuery {
    columns: &'static str,
    from: &'static str,
    filters: Vec<Filter>,
    order_by: &'static str,
    searchable: &'static [&'static str],
}

impl ListQuery {
    pub fn new(columns: &'static str, from: &'static str) -> Self {
        Self {
            columns,
            from,
            filters: Vec::new(),
            order_by: "id",
            searchable: &[],
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// `ORDER BY` clause. Should end in a unique column so windows are stable.
    pub fn order_by(mut self, order_by: &'static str) -> Self {
        self.order_by = order_by;
        self
    }

    /// Column expressions matched case-insensitively against the search term.
    pub fn searchable(mut self, columns: &'static [&'static str]) -> Self {
        self.searchable = columns;
        self
    }

    /// `SELECT COUNT(*)` over the filtered set.
    pub fn count_query(&self, search: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(self.from);
        self.push_predicate(&mut qb, search);
        qb
    }

    /// Windowed `SELECT` over the same filtered set.
    pub fn fetch_query(
        &self,
        search: &str,
        offset: i64,
        limit: i64,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.columns);
        qb.push(" FROM ");
        qb.push(self.from);
        self.push_predicate(&mut qb, search);
        qb.push(" ORDER BY ");
        qb.push(self.order_by);
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
        qb
    }

    // Shared by count and fetch so both see exactly the same rows.
    fn push_predicate(&self, qb: &mut QueryBuilder<'static, Postgres>, search: &str) {
        let mut has_where = false;
        let mut conjunction = |qb: &mut QueryBuilder<'static, Postgres>| {
            qb.push(if has_where { " AND " } else { " WHERE " });
            has_where = true;
        };

        for filter in &self.filters {
            conjunction(qb);
            match filter {
                Filter::Eq(column, value) => {
                    qb.push(*column);
                    qb.push(" = ");
                    qb.push_bind(*value);
                }
                Filter::IsNull(column) => {
                    qb.push(*column);
                    qb.push(" IS NULL");
                }
            }
        }

        let term = search.trim();
        if term.is_empty() || self.searchable.is_empty() {
            return;
        }

        let pattern = format!("%{}%", escape_like(term));
        conjunction(qb);
        qb.push("(");
        for (i, column) in self.searchable.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column);
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }
}

/// Escape LIKE wildcards so the term matches as a literal substring.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Count the filtered rows, resolve the page window and fetch it.
///
/// Both statements run in one read-only `REPEATABLE READ` transaction, so
/// the totals always describe the snapshot the window was cut from.
pub async fn paginate<T>(
    pool: &PgPool,
    query: &ListQuery,
    request: PageRequest,
    search: &str,
) -> Result<Page<T>, PaginationError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let total_items: i64 = query
        .count_query(search)
        .build_query_scalar()
        .fetch_one(&mut *tx)
        .await?;

    let window = request.window(total_items);

    let records = if window.is_empty() {
        Vec::new()
    } else {
        query
            .fetch_query(search, window.offset, window.limit)
            .build_query_as::<T>()
            .fetch_all(&mut *tx)
            .await?
    };

    tx.commit().await?;

    tracing::debug!(
        from = query.from,
        search = search,
        total_items = window.pagination.total_items,
        current_page = window.pagination.current_page,
        "Paginated query"
    );

    Ok(Page {
        records,
        pagination: window.pagination,
    })
}
