//! Partial updates
//!
//! Each patch carries one `Option` per mutable field. `None` leaves the
//! field untouched. Nullable content references use `Option<Option<_>>`
//! so that "clear" (`Some(None)`) differs from "keep" (`None`).

use serde::Deserialize;

use super::models::{Course, Module, User};
use super::money::Price;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub topics: Option<Vec<String>>,
    pub price: Option<Price>,
    #[serde(skip)]
    pub thumbnail_path: Option<Option<String>>,
}

impl CoursePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.instructor.is_none()
            && self.topics.is_none()
            && self.price.is_none()
            && self.thumbnail_path.is_none()
    }

    pub fn apply(&self, course: &mut Course) {
        if let Some(title) = &self.title {
            course.title = title.clone();
        }
        if let Some(description) = &self.description {
            course.description = description.clone();
        }
        if let Some(instructor) = &self.instructor {
            course.instructor = instructor.clone();
        }
        if let Some(topics) = &self.topics {
            course.topics = topics.clone();
        }
        if let Some(price) = self.price {
            course.price = price.value();
        }
        if let Some(thumbnail_path) = &self.thumbnail_path {
            course.thumbnail_path = thumbnail_path.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModulePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(skip)]
    pub pdf_path: Option<Option<String>>,
    #[serde(skip)]
    pub video_path: Option<Option<String>>,
}

impl ModulePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.pdf_path.is_none()
            && self.video_path.is_none()
    }

    pub fn apply(&self, module: &mut Module) {
        if let Some(title) = &self.title {
            module.title = title.clone();
        }
        if let Some(description) = &self.description {
            module.description = description.clone();
        }
        if let Some(pdf_path) = &self.pdf_path {
            module.pdf_path = pdf_path.clone();
        }
        if let Some(video_path) = &self.video_path {
            module.video_path = video_path.clone();
        }
    }
}

/// Admin edit of a user. Balance is only changed through
/// the increment operation or a purchase, never here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
    }
}

/// Drops blank strings so that an empty form field means "unchanged".
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses an optional price field, treating blank as absent.
pub fn parse_price(value: Option<&str>) -> Result<Option<Price>, super::money::MoneyError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse::<Price>().map(Some),
        None => Ok(None),
    }
}
