//! ``src/ingest/validate.rs``
//!
//! Validation stage: decide whether a raw input may be read at all.

use crate::config::IngestConfig;
use crate::error::ValidationError;
use crate::ingest::source::RawFile;
use crate::model::{
    media::MediaType,
    store::{FileStore, validate_name},
};

/// Check `file` against the limits and the live store.
///
/// On success returns the media classification used for reading.
pub fn validate(
    file: &RawFile,
    store: &FileStore,
    config: &IngestConfig,
) -> Result<MediaType, ValidationError> {
    if file.size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if file.size > config.max_file_size {
        return Err(ValidationError::TooLarge {
            size: file.size,
            max: config.max_file_size,
        });
    }

    validate_name(&file.name)?;

    if !config.is_allowed(&file.mime, &file.name) {
        let mime = if file.mime.is_empty() {
            "unknown".into()
        } else {
            file.mime.clone()
        };
        return Err(ValidationError::UnsupportedType { mime });
    }

    if store
        .find_duplicate(&file.name, file.size, file.last_modified)
        .is_some()
    {
        return Err(ValidationError::Duplicate {
            name: file.name.clone(),
        });
    }

    Ok(MediaType::classify(&file.mime, &file.name, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryFile;
    use crate::model::record::RecordDraft;
    use crate::model::media::Content;

    fn check(file: MemoryFile) -> Result<MediaType, ValidationError> {
        validate(&file.into_raw(), &FileStore::default(), &IngestConfig::default())
    }

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(check(MemoryFile::text("e.txt", "")), Err(ValidationError::EmptyFile));

        let config = IngestConfig::default();
        let big = MemoryFile::text("big.txt", "x").declared_size(config.max_file_size + 1);
        assert!(matches!(check(big), Err(ValidationError::TooLarge { .. })));

        assert!(matches!(
            check(MemoryFile::text("bad|name.txt", "x")),
            Err(ValidationError::InvalidName { .. })
        ));

        assert_eq!(
            check(MemoryFile::new("setup.exe", "application/x-msdownload", "MZ")),
            Err(ValidationError::UnsupportedType {
                mime: "application/x-msdownload".into()
            })
        );
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let config = IngestConfig::default();
        let at_limit = MemoryFile::text("edge.txt", "x").declared_size(config.max_file_size);
        assert_eq!(check(at_limit), Ok(MediaType::Text));

        let over = MemoryFile::text("edge.txt", "x").declared_size(config.max_file_size + 1);
        assert_eq!(
            check(over),
            Err(ValidationError::TooLarge {
                size: config.max_file_size + 1,
                max: config.max_file_size,
            })
        );
    }

    #[test]
    fn test_accepts_and_classifies() {
        assert_eq!(check(MemoryFile::text("a.md", "# a")), Ok(MediaType::Text));
        assert_eq!(
            check(MemoryFile::new("p.png", "image/png", vec![1u8, 2, 3])),
            Ok(MediaType::Image)
        );
    }

    #[test]
    fn test_duplicate_against_store() {
        let raw = MemoryFile::text("a.txt", "abc").into_raw();
        let mut store = FileStore::default();
        store
            .add(RecordDraft {
                name: raw.name.clone(),
                relative_path: raw.relative_path.clone(),
                mime: raw.mime.clone(),
                media_type: MediaType::Text,
                content: Content::Text("abc".into()),
                size: raw.size,
                last_modified: raw.last_modified,
            })
            .unwrap();

        assert!(matches!(
            validate(&raw, &store, &IngestConfig::default()),
            Err(ValidationError::Duplicate { .. })
        ));
    }
}
