//! Upload panel: the pending file set and the upload lifecycle.

use crate::api::{ApiError, MAX_FILES, UPLOAD_FALLBACK};
use crate::files::FileDescriptor;
use crate::notify::Notifier;
use crate::state::UploadResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Uploading { percent: u8 },
}

/// Reported to the owner when an upload finishes successfully
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Completed { file_ids: Vec<String>, message: String },
}

#[derive(Debug, Default)]
pub struct UploadPanel {
    files: Vec<FileDescriptor>,
    phase: UploadPhase,
}

impl UploadPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.phase, UploadPhase::Uploading { .. })
    }

    pub fn percent(&self) -> u8 {
        match self.phase {
            UploadPhase::Uploading { percent } => percent,
            UploadPhase::Idle => 0,
        }
    }

    /// Append a selection, keeping at most `MAX_FILES`. Returns how many were accepted.
    pub fn add_files(&mut self, incoming: Vec<FileDescriptor>, notifier: &mut Notifier) -> usize {
        if self.is_uploading() || incoming.is_empty() {
            return 0;
        }

        let combined = self.files.len() + incoming.len();
        if combined > MAX_FILES {
            notifier.warning(
                &format!("You can upload a maximum of {} files.", MAX_FILES),
                Some(format!("{} file(s) were not added.", combined - MAX_FILES)),
            );
        }

        let remaining = MAX_FILES.saturating_sub(self.files.len());
        let accepted: Vec<FileDescriptor> = incoming.into_iter().take(remaining).collect();
        let count = accepted.len();
        self.files.extend(accepted);
        count
    }

    pub fn remove_file(&mut self, index: usize) -> Option<FileDescriptor> {
        if self.is_uploading() || index >= self.files.len() {
            return None;
        }
        Some(self.files.remove(index))
    }

    /// Empty the set. Refused while an upload is running.
    pub fn clear_all(&mut self) -> bool {
        if self.is_uploading() {
            return false;
        }
        self.files.clear();
        true
    }

    /// Enter the uploading state and hand back the files to send.
    pub fn begin_upload(&mut self, notifier: &mut Notifier) -> Option<Vec<FileDescriptor>> {
        if self.is_uploading() {
            return None;
        }
        if self.files.is_empty() {
            notifier.error("Please select at least one file to upload.", None);
            return None;
        }
        self.phase = UploadPhase::Uploading { percent: 0 };
        tracing::info!(count = self.files.len(), "starting upload");
        Some(self.files.clone())
    }

    pub fn set_progress(&mut self, percent: u8) {
        if let UploadPhase::Uploading { percent: current } = &mut self.phase {
            *current = percent.min(100);
        }
    }

    pub fn finish_upload(
        &mut self,
        result: Result<UploadResponse, ApiError>,
        notifier: &mut Notifier,
    ) -> Option<UploadEvent> {
        self.phase = UploadPhase::Idle;
        match result {
            Ok(response) if response.success => {
                notifier.success("Upload complete!", Some(response.message.clone()));
                self.files.clear();
                Some(UploadEvent::Completed {
                    file_ids: response.file_ids,
                    message: response.message,
                })
            }
            Ok(response) => {
                let description = if response.message.is_empty() {
                    "Please try again.".to_string()
                } else {
                    response.message
                };
                notifier.error("Upload failed", Some(description));
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "upload failed");
                notifier.error("Upload failed", Some(e.user_message(UPLOAD_FALLBACK)));
                None
            }
        }
    }

    /// Header line above the file list, e.g. `Files (2/5)`
    pub fn header(&self) -> String {
        format!("Files ({}/{})", self.files.len(), MAX_FILES)
    }

    pub fn button_label(&self) -> String {
        if self.is_uploading() {
            return "Uploading...".to_string();
        }
        let n = self.files.len();
        format!("Upload {} file{}", n, if n == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;

    fn file(name: &str) -> FileDescriptor {
        FileDescriptor {
            path: name.into(),
            name: name.to_string(),
            size: 2048,
            mime: "application/pdf".to_string(),
        }
    }

    fn files(n: usize) -> Vec<FileDescriptor> {
        (0..n).map(|i| file(&format!("doc{}.pdf", i))).collect()
    }

    #[test]
    fn test_six_files_keeps_five() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        assert_eq!(panel.add_files(files(6), &mut notifier), 5);
        assert_eq!(panel.files().len(), 5);
        let warning = notifier.latest().unwrap();
        assert_eq!(warning.level, Level::Warning);
        assert_eq!(warning.description.as_deref(), Some("1 file(s) were not added."));
    }

    #[test]
    fn test_add_concatenates_up_to_capacity() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        panel.add_files(files(3), &mut notifier);
        assert!(notifier.is_empty());
        assert_eq!(panel.add_files(files(4), &mut notifier), 2);
        assert_eq!(panel.files().len(), 5);
        assert_eq!(
            notifier.latest().unwrap().description.as_deref(),
            Some("2 file(s) were not added.")
        );
        // Full set: nothing more fits
        assert_eq!(panel.add_files(files(1), &mut notifier), 0);
        assert_eq!(panel.files().len(), 5);
    }

    #[test]
    fn test_duplicates_allowed() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        panel.add_files(vec![file("a.pdf"), file("a.pdf")], &mut notifier);
        assert_eq!(panel.files().len(), 2);
    }

    #[test]
    fn test_capacity_holds_across_mixed_operations() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        // Deterministic pseudo-random walk of adds and removes
        let mut seed: u32 = 7;
        for _ in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let n = (seed >> 16) as usize % 4;
            if seed % 3 == 0 {
                panel.remove_file(n);
            } else {
                panel.add_files(files(n), &mut notifier);
            }
            assert!(panel.files().len() <= MAX_FILES);
        }
    }

    #[test]
    fn test_remove_by_index() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        panel.add_files(vec![file("a.pdf"), file("b.pdf"), file("c.pdf")], &mut notifier);
        assert_eq!(panel.remove_file(1).unwrap().name, "b.pdf");
        assert!(panel.remove_file(7).is_none());
        let names: Vec<&str> = panel.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "c.pdf"]);
    }

    #[test]
    fn test_empty_upload_rejected() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        assert!(panel.begin_upload(&mut notifier).is_none());
        assert_eq!(panel.phase(), UploadPhase::Idle);
        assert_eq!(notifier.latest().unwrap().title, "Please select at least one file to upload.");
    }

    #[test]
    fn test_mutations_blocked_while_uploading() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        panel.add_files(files(2), &mut notifier);
        assert!(panel.begin_upload(&mut notifier).is_some());
        assert!(!panel.clear_all());
        assert!(panel.remove_file(0).is_none());
        assert_eq!(panel.add_files(files(1), &mut notifier), 0);
        assert!(panel.begin_upload(&mut notifier).is_none());
        assert_eq!(panel.files().len(), 2);
    }

    #[test]
    fn test_progress_then_success_clears() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        panel.add_files(files(2), &mut notifier);
        panel.begin_upload(&mut notifier);
        panel.set_progress(40);
        assert_eq!(panel.percent(), 40);

        let event = panel.finish_upload(
            Ok(UploadResponse {
                success: true,
                file_ids: vec!["f1".into(), "f2".into()],
                message: "Successfully uploaded 2 file(s)".into(),
            }),
            &mut notifier,
        );
        assert!(matches!(event, Some(UploadEvent::Completed { ref file_ids, .. }) if file_ids.len() == 2));
        assert!(panel.files().is_empty());
        assert_eq!(panel.phase(), UploadPhase::Idle);
        assert_eq!(panel.percent(), 0);
        assert_eq!(notifier.latest().unwrap().level, Level::Success);
    }

    #[test]
    fn test_failure_keeps_files() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        panel.add_files(files(2), &mut notifier);
        panel.begin_upload(&mut notifier);
        let event = panel.finish_upload(Err(ApiError::Task("boom".into())), &mut notifier);
        assert!(event.is_none());
        assert_eq!(panel.files().len(), 2);
        let last = notifier.latest().unwrap();
        assert_eq!(last.title, "Upload failed");
        assert_eq!(last.description.as_deref(), Some(UPLOAD_FALLBACK));
    }

    #[test]
    fn test_unsuccessful_response_keeps_files() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        panel.add_files(files(1), &mut notifier);
        panel.begin_upload(&mut notifier);
        panel.finish_upload(
            Ok(UploadResponse { success: false, file_ids: vec![], message: String::new() }),
            &mut notifier,
        );
        assert_eq!(panel.files().len(), 1);
        assert_eq!(notifier.latest().unwrap().description.as_deref(), Some("Please try again."));
    }

    #[test]
    fn test_labels() {
        let mut panel = UploadPanel::new();
        let mut notifier = Notifier::default();
        assert_eq!(panel.button_label(), "Upload 0 files");
        panel.add_files(files(1), &mut notifier);
        assert_eq!(panel.button_label(), "Upload 1 file");
        assert_eq!(panel.header(), "Files (1/5)");
    }
}
