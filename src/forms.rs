//! Form payloads accepted by the project views.
//!
//! Every form deserializes with defaults for missing fields so that bad
//! input reaches `validate()` and is reported per field, rather than being
//! rejected by the extractor.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::{PreparationStatus, UpdateProjectSummary};
use crate::{Error, Result};

pub const NAME_MAX_CHARS: usize = 100;
pub const SHORT_DESCRIPTION_MAX_CHARS: usize = 125;
pub const LONG_DESCRIPTION_MAX_CHARS: usize = 700;
pub const LINK_NAME_MAX_CHARS: usize = 100;
pub const SUBJECT_MAX_CHARS: usize = 100;

/// Image types accepted for project pictures.
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/gif"];

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn into_result(self) -> std::result::Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
        }
    }

    fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        let len = value.trim().chars().count();
        if len > max {
            self.add(
                field,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max, len
                ),
            );
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Name and descriptions of a project, used by create and edit.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectForm {
    pub name: String,
    pub short_description: String,
    pub long_description: String,
}

impl ProjectForm {
    pub fn validate(&self) -> std::result::Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.required("name", &self.name);
        errors.max_chars("name", &self.name, NAME_MAX_CHARS);
        errors.required("short_description", &self.short_description);
        errors.max_chars(
            "short_description",
            &self.short_description,
            SHORT_DESCRIPTION_MAX_CHARS,
        );
        errors.max_chars(
            "long_description",
            &self.long_description,
            LONG_DESCRIPTION_MAX_CHARS,
        );
        errors.into_result()
    }

    /// Prefill from an existing project.
    pub fn from_project(project: &crate::db::Project) -> Self {
        Self {
            name: project.name.clone(),
            short_description: project.short_description.clone(),
            long_description: project.long_description.clone(),
        }
    }

    pub fn into_update(self) -> UpdateProjectSummary {
        UpdateProjectSummary {
            name: self.name.trim().to_string(),
            short_description: self.short_description.trim().to_string(),
            long_description: self.long_description.trim().to_string(),
        }
    }
}

// ============================================================================
// Links
// ============================================================================

/// A link to add to a project.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectLinksForm {
    pub name: String,
    pub url: String,
}

impl ProjectLinksForm {
    pub fn validate(&self) -> std::result::Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.required("name", &self.name);
        errors.max_chars("name", &self.name, LINK_NAME_MAX_CHARS);

        if self.url.trim().is_empty() {
            errors.required("url", &self.url);
        } else {
            match url::Url::parse(self.url.trim()) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => errors.add("url", "Enter a valid URL."),
            }
        }

        errors.into_result()
    }
}

// ============================================================================
// Preparation status
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectPreparationStatusForm {
    pub preparation_status: String,
}

impl ProjectPreparationStatusForm {
    pub fn from_status(status: PreparationStatus) -> Self {
        Self {
            preparation_status: status.as_str().to_string(),
        }
    }

    /// Validate and return the chosen status.
    pub fn validate(&self) -> std::result::Result<PreparationStatus, FormErrors> {
        self.preparation_status.trim().parse().map_err(|_| {
            let mut errors = FormErrors::default();
            errors.add(
                "preparation_status",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    self.preparation_status
                ),
            );
            errors
        })
    }
}

// ============================================================================
// Contact followers
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectContactUsersForm {
    pub subject: String,
    pub message: String,
}

impl ProjectContactUsersForm {
    pub fn validate(&self) -> std::result::Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.required("subject", &self.subject);
        errors.max_chars("subject", &self.subject, SUBJECT_MAX_CHARS);
        errors.required("message", &self.message);
        errors.into_result()
    }
}

// ============================================================================
// Followers
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddFollowerForm {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteFollowerForm {
    pub follower_id: Option<String>,
}

// ============================================================================
// Image upload
// ============================================================================

/// An uploaded project image read from a multipart body.
#[derive(Debug, Clone)]
pub struct ProjectImageForm {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ProjectImageForm {
    /// Read the `image` field from a multipart body.
    ///
    /// Returns `Ok(None)` when no file was sent. Stops reading as soon as
    /// the file grows past `max_size`.
    pub async fn from_multipart(multipart: &mut Multipart, max_size: usize) -> Result<Option<Self>> {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| read_error(e, max_size))?
        {
            if field.name() != Some("image") {
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_string();
            let declared = field.content_type().map(|s| s.to_string());

            let mut data: Vec<u8> = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(|e| read_error(e, max_size))? {
                if data.len() + chunk.len() > max_size {
                    return Err(Error::FileTooLarge { max_size });
                }
                data.extend_from_slice(&chunk);
            }

            if data.is_empty() && filename.is_empty() {
                return Ok(None);
            }

            // Browsers send octet-stream for unknown types; trust the extension then.
            let content_type = match declared {
                Some(ct) if ct != "application/octet-stream" => ct,
                _ => mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string(),
            };

            return Ok(Some(Self {
                filename,
                content_type,
                data: Bytes::from(data),
            }));
        }

        Ok(None)
    }

    pub fn validate(&self, max_size: usize) -> std::result::Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.data.is_empty() {
            errors.add("image", "The submitted file is empty.");
        }
        if self.data.len() > max_size {
            errors.add(
                "image",
                format!("Image must be at most {} bytes.", max_size),
            );
        }
        if !ALLOWED_IMAGE_TYPES.contains(&self.content_type.as_str()) {
            errors.add(
                "image",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            );
        }
        errors.into_result()
    }
}

/// A body cut off by the request size limit counts as an oversized file.
fn read_error(err: MultipartError, max_size: usize) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::FileTooLarge { max_size }
    } else {
        Error::InvalidInput(format!("Failed to read upload: {}", err.body_text()))
    }
}

/// Error used when the `image` field is missing entirely.
pub fn missing_image_errors() -> FormErrors {
    let mut errors = FormErrors::default();
    errors.add("image", "This field is required.");
    errors
}

/// Report a failure to read the upload against the `image` field.
///
/// Errors unrelated to the upload itself are handed back unchanged.
pub fn image_read_errors(err: Error) -> std::result::Result<FormErrors, Error> {
    let message = match &err {
        Error::FileTooLarge { max_size } => format!("Image must be at most {} bytes.", max_size),
        Error::InvalidInput(_) => {
            "No file was submitted. Check the encoding type on the form.".to_string()
        }
        _ => return Err(err),
    };

    let mut errors = FormErrors::default();
    errors.add("image", message);
    Ok(errors)
}
