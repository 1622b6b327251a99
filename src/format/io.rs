//! Import/export orchestration: the only place that touches the file
//! system.
//!
//! Codecs transform in-memory file maps; this module reads sources into
//! those maps, merges decode results into a fresh set, and writes encode
//! results out. Hard failures (unreadable source, auxiliary-file write
//! failure, single-document write failure) propagate as `Err`; everything
//! recoverable lands in the operation report so one bad file never aborts
//! a batch.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::format::error::FormatError;
use crate::format::traits::{AnnotationCodec, CancelFlag, ErrorEntry};
use crate::model::{AnnotationSet, ImageIndex};

/// Options controlling an import operation.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Keep annotations already present in the destination set. When
    /// false, the merge starts from an empty set.
    pub keep_existing: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { keep_existing: true }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_existing(mut self, keep: bool) -> Self {
        self.keep_existing = keep;
        self
    }
}

/// Which operation produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Import,
    Export,
}

/// Consolidated result of an import or export.
#[derive(Debug)]
pub struct OperationReport {
    pub operation_type: OperationType,
    /// Codec-defined success unit: files for per-image formats, entries or
    /// rows for single-document formats, shapes written on export.
    pub success_count: usize,
    /// Sorted by (source, description).
    pub error_entries: Vec<ErrorEntry>,
}

impl OperationReport {
    fn new(operation_type: OperationType, success_count: usize, mut errors: Vec<ErrorEntry>) -> Self {
        errors.sort();
        Self {
            operation_type,
            success_count,
            error_entries: errors,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error_entries.is_empty()
    }
}

/// Result of a successful import call.
#[derive(Debug)]
pub struct ImportOutcome {
    /// The merged annotation set. The caller's existing set is never
    /// mutated; adopting the result is the caller's decision.
    pub set: AnnotationSet,
    pub report: OperationReport,
}

/// Result of a successful export call.
#[derive(Debug)]
pub struct ExportOutcome {
    /// Paths actually written, in write order.
    pub files_created: Vec<PathBuf>,
    pub report: OperationReport,
}

/// Import annotations from `source` using the given codec.
///
/// `source` is a directory for per-image formats and a file for
/// single-document formats. The existing set is cloned, not mutated:
/// categories reconcile by name (the existing color wins) and per-image
/// entries are replaced wholesale.
pub fn import_annotations(
    source: &Path,
    codec: &dyn AnnotationCodec,
    images: &ImageIndex,
    existing: &AnnotationSet,
    options: &ImportOptions,
    cancel: &CancelFlag,
) -> Result<ImportOutcome, FormatError> {
    log::info!("Importing {} annotations from {source:?}", codec.id());

    let (files, mut errors) = if codec.per_image() {
        read_directory(source, codec)?
    } else {
        (read_single_file(source)?, Vec::new())
    };

    let batch = codec.decode(&files, images, cancel)?;
    errors.extend(batch.errors);

    let mut set = if options.keep_existing {
        existing.clone()
    } else {
        AnnotationSet::new()
    };
    set.merge(batch.categories, batch.annotations);

    Ok(ImportOutcome {
        set,
        report: OperationReport::new(OperationType::Import, batch.success_count, errors),
    })
}

/// Export an annotation set to `destination` using the given codec.
///
/// `destination` is a directory for per-image formats (created if absent)
/// and a file path for single-document formats. Auxiliary files are
/// written first and their failure is a hard error; a failed per-image
/// write becomes an error entry and the remaining files are still written.
pub fn export_annotations(
    destination: &Path,
    codec: &dyn AnnotationCodec,
    set: &AnnotationSet,
    cancel: &CancelFlag,
) -> Result<ExportOutcome, FormatError> {
    log::info!("Exporting {} annotations to {destination:?}", codec.id());

    let batch = codec.encode(set)?;
    let mut errors = batch.errors;
    let mut files_created = Vec::new();

    if codec.per_image() {
        fs::create_dir_all(destination)?;

        // Per-image files are useless without their auxiliary files, so
        // those write first and fail hard.
        for aux in codec.auxiliary_files() {
            if let Some(content) = batch.files.get(*aux) {
                let path = destination.join(aux);
                fs::write(&path, content)?;
                files_created.push(path);
            }
        }

        for (name, content) in &batch.files {
            if codec.auxiliary_files().contains(&name.as_str()) {
                continue;
            }
            if cancel.is_cancelled() {
                log::info!("Export cancelled after {} files", files_created.len());
                break;
            }
            let path = destination.join(name);
            match fs::write(&path, content) {
                Ok(()) => files_created.push(path),
                Err(e) => errors.push(ErrorEntry::new(
                    name.clone(),
                    format!("Failed to write file: {e}"),
                )),
            }
        }
    } else {
        let Some(content) = batch.files.values().next() else {
            return Err(FormatError::invalid_format("Nothing to export"));
        };
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(destination, content)?;
        files_created.push(destination.to_path_buf());
    }

    Ok(ExportOutcome {
        files_created,
        report: OperationReport::new(OperationType::Export, batch.shapes_encoded, errors),
    })
}

/// Read every annotation file of a per-image format from a directory.
///
/// A file that cannot be read (missing permission, invalid UTF-8) is
/// fatal to that file only: it gets an error entry and the rest of the
/// directory is still processed. Only the directory itself being
/// unreadable is a hard error.
fn read_directory(
    source: &Path,
    codec: &dyn AnnotationCodec,
) -> Result<(BTreeMap<String, String>, Vec<ErrorEntry>), FormatError> {
    if !source.is_dir() {
        return Err(FormatError::invalid_source(source));
    }

    let mut files = BTreeMap::new();
    let mut errors = Vec::new();
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let wanted = codec.auxiliary_files().contains(&name)
            || path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| codec.extensions().contains(&e));
        if !wanted {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(content) => {
                files.insert(name.to_string(), content);
            }
            Err(e) => {
                log::warn!("Skipping unreadable file {path:?}: {e}");
                errors.push(ErrorEntry::new(name, format!("Cannot read file: {e}")));
            }
        }
    }
    Ok((files, errors))
}

fn read_single_file(source: &Path) -> Result<BTreeMap<String, String>, FormatError> {
    if !source.is_file() {
        return Err(FormatError::invalid_source(source));
    }
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("annotations")
        .to_string();
    let mut files = BTreeMap::new();
    files.insert(name, fs::read_to_string(source)?);
    Ok(files)
}
