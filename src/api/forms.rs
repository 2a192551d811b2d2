//! Multipart form decoding for catalog uploads

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{AppError, AppResult};
use crate::storage::Upload;

/// Text fields and file parts of a multipart body.
///
/// Repeated text fields keep every value. File parts with an empty
/// body (an unfilled file input) are dropped.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Upload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(|e| {
                        AppError::InvalidRequest(format!("failed to read file '{name}': {e}"))
                    })?;
                    if !bytes.is_empty() {
                        form.insert_file(name, Upload::new(file_name, bytes.to_vec()));
                    }
                }
                None => {
                    let value = field.text().await.map_err(|e| {
                        AppError::InvalidRequest(format!("failed to read field '{name}': {e}"))
                    })?;
                    form.insert_text(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    pub fn insert_file(&mut self, name: impl Into<String>, upload: Upload) {
        self.files.insert(name.into(), upload);
    }

    /// First value of a text field, trimmed. Blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Like [`FormData::text`] but absent is an error.
    pub fn required(&self, name: &str) -> AppResult<String> {
        self.text(name)
            .ok_or_else(|| AppError::InvalidRequest(format!("field '{name}' is required")))
    }

    /// All values of a list field. Each value may itself be comma separated.
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        let values: Vec<String> = self
            .fields
            .get(name)?
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    pub fn integer(&self, name: &str) -> AppResult<Option<i32>> {
        self.text(name)
            .map(|raw| {
                raw.parse::<i32>().map_err(|_| {
                    AppError::InvalidRequest(format!("field '{name}' must be an integer"))
                })
            })
            .transpose()
    }

    /// `true`, `1`, `on` and `yes` are truthy; anything else is false.
    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes"))
            .unwrap_or(false)
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
