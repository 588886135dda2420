//! File selection: descriptors, the accepted document types and display helpers.

use std::path::{Path, PathBuf};

/// Document types the assistant accepts, keyed by extension
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime: String,
}

impl FileDescriptor {
    /// Describe a file on disk. Returns `None` for missing files, directories
    /// and anything outside the accepted types.
    pub fn from_path(path: &Path) -> Option<Self> {
        let mime = mime_for_path(path)?;
        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        let name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            mime: mime.to_string(),
        })
    }

    pub fn icon(&self) -> &'static str {
        file_icon(&self.mime)
    }

    pub fn type_label(&self) -> String {
        file_type_label(&self.mime)
    }

    /// Size in whole kilobytes, rounded
    pub fn size_kb(&self) -> u64 {
        (self.size + 512) / 1024
    }
}

/// MIME type for an accepted extension (case-insensitive)
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Turn user-supplied paths into descriptors, dropping anything not accepted.
/// Directories contribute their directly contained accepted files, sorted by name.
pub fn select_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<FileDescriptor> {
    let mut selected = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = match std::fs::read_dir(path) {
                Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "unreadable directory");
                    continue;
                }
            };
            entries.sort();
            selected.extend(entries.iter().filter_map(|p| FileDescriptor::from_path(p)));
        } else if let Some(file) = FileDescriptor::from_path(path) {
            selected.push(file);
        } else {
            tracing::debug!(path = %path.display(), "skipping unsupported file");
        }
    }
    selected
}

/// Split a typed path list on whitespace, honouring double quotes
pub fn split_path_list(input: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in input.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    paths.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(current);
    }
    paths
}

pub fn file_icon(mime: &str) -> &'static str {
    if mime.contains("pdf") {
        "📄"
    } else if mime.contains("sheet") || mime.contains("excel") || mime.contains("csv") {
        "📊"
    } else if mime.contains("powerpoint") || mime.contains("presentation") {
        "📑"
    } else if mime.contains("word") {
        "📝"
    } else if mime.contains("image") {
        "🖼️"
    } else if mime.contains("text") {
        "📃"
    } else {
        "📁"
    }
}

// Spreadsheet and presentation MIME types also contain "officedocument",
// so they are matched before the word-processing check.
pub fn file_type_label(mime: &str) -> String {
    let subtype = mime.split('/').nth(1).unwrap_or_default();
    let label = if mime.contains("pdf") {
        "PDF"
    } else if mime.contains("sheet") || mime.contains("excel") {
        "XLSX"
    } else if mime.contains("csv") {
        "CSV"
    } else if mime.contains("powerpoint") || mime.contains("presentation") {
        "PPTX"
    } else if mime.contains("word") {
        "DOCX"
    } else if mime.contains("image") {
        return subtype.to_uppercase();
    } else if mime.contains("text") {
        "TXT"
    } else if !subtype.is_empty() {
        return subtype.to_uppercase();
    } else {
        "File"
    };
    label.to_string()
}
