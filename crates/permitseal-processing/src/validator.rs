//! Upload validation.
//!
//! All checks run before the pipeline creates a record, so a rejected file
//! never touches the stores.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Upload validator for permit documents.
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }
        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        // Strip any parameters (e.g. "; charset=binary") before comparing
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }
        Ok(())
    }

    /// Run every check for an incoming upload.
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        self.validate_file_size(size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_validator() -> UploadValidator {
        UploadValidator::new(
            10 * 1024 * 1024,
            vec!["pdf".to_string()],
            vec!["application/pdf".to_string()],
        )
    }

    #[test]
    fn test_valid_pdf_passes() {
        let v = pdf_validator();
        assert!(v.validate_all("permit.pdf", "application/pdf", 1024).is_ok());
        assert!(v.validate_all("PERMIT.PDF", "Application/PDF", 1024).is_ok());
    }

    #[test]
    fn test_non_pdf_rejected() {
        let v = pdf_validator();
        assert!(matches!(
            v.validate_all("permit.docx", "application/pdf", 1024),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            v.validate_all("permit.pdf", "image/png", 1024),
            Err(ValidationError::InvalidContentType { .. })
        ));
        assert!(matches!(
            v.validate_all("permit", "application/pdf", 1024),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_size_limits() {
        let v = UploadValidator::new(
            100,
            vec!["pdf".to_string()],
            vec!["application/pdf".to_string()],
        );
        assert!(matches!(
            v.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(matches!(
            v.validate_file_size(101),
            Err(ValidationError::FileTooLarge { .. })
        ));
        assert!(v.validate_file_size(100).is_ok());
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let v = pdf_validator();
        assert!(v
            .validate_content_type("application/pdf; charset=binary")
            .is_ok());
    }
}
