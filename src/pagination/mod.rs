//! Pagination module
//!
//! Search-and-paginate engine shared by every list endpoint.
//! `window` holds the page arithmetic, `query` runs the count and
//! windowed fetch against PostgreSQL with one shared predicate.

mod error;
mod query;
mod window;

pub use error::PaginationError;
pub use query::{paginate, Filter, ListQuery};
pub use window::{Page, PageRequest, PageWindow, Pagination, DEFAULT_LIMIT, DEFAULT_PAGE};
