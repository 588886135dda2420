//! In-process stand-in for the assistant backend, for demos and tests.

use std::time::Duration;

use rand::Rng;

use crate::api::{ApiError, ProgressFn, MAX_FILES};
use crate::chart::{ChartData, ChartKind, ChartPayload, Dataset, SeriesChart};
use crate::files::FileDescriptor;
use crate::state::{now_millis, ChatMessage, ChatResponse, FollowUpQuestion, UploadResponse};

pub const DEFAULT_LATENCY_MS: u64 = 1500;

const MONTHS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];
const BRAND_FILL: &str = "rgba(126, 105, 171, 0.6)";
const BRAND_STROKE: &str = "rgba(126, 105, 171, 1)";

const CHART_REPLY: &str = "Here's the chart you requested based on the document data.";
const GENERIC_REPLY: &str = "Based on the documents you've uploaded, I can provide the following information: Lorem ipsum dolor sit amet, consectetur adipiscing elit. Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";

#[derive(Debug, Clone)]
pub struct MockBackend {
    latency: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_LATENCY_MS))
    }
}

impl MockBackend {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub async fn upload_files(
        &self,
        files: &[FileDescriptor],
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadResponse, ApiError> {
        if files.is_empty() || files.len() > MAX_FILES {
            return Err(ApiError::Invalid(format!(
                "expected 1 to {} files, got {}",
                MAX_FILES,
                files.len()
            )));
        }

        // Spread the simulated latency over a few progress steps
        let step = self.latency / 4;
        for pct in [25u8, 50, 75, 100] {
            tokio::time::sleep(step).await;
            if let Some(report) = &on_progress {
                report(pct);
            }
        }

        let now = now_millis();
        Ok(UploadResponse {
            success: true,
            file_ids: (0..files.len()).map(|i| format!("file-{}-{}", i, now)).collect(),
            message: format!("Successfully uploaded {} files.", files.len()),
        })
    }

    pub async fn send_chat_message(
        &self,
        message: &str,
        _history: &[ChatMessage],
    ) -> Result<ChatResponse, ApiError> {
        tokio::time::sleep(self.latency).await;

        let lower = message.to_lowercase();
        let wants_chart = ["chart", "graph", "plot"].iter().any(|w| lower.contains(w));
        let now = now_millis();

        let chart_data = wants_chart.then(|| {
            ChartPayload::Series(SeriesChart {
                kind: ChartKind::Bar,
                data: ChartData {
                    labels: MONTHS.iter().map(|m| m.to_string()).collect(),
                    datasets: vec![Dataset {
                        label: Some("Revenue".to_string()),
                        data: vec![12.0, 19.0, 3.0, 5.0, 2.0, 3.0],
                        background_color: Some(BRAND_FILL.to_string()),
                        border_color: None,
                    }],
                },
            })
        });

        Ok(ChatResponse {
            message: ChatMessage::assistant(
                format!("msg-{}", now),
                if wants_chart { CHART_REPLY } else { GENERIC_REPLY },
                now,
            ),
            follow_up_questions: Some(vec![
                FollowUpQuestion {
                    id: format!("q1-{}", now),
                    text: "Can you summarize the main findings?".to_string(),
                },
                FollowUpQuestion {
                    id: format!("q2-{}", now),
                    text: "What are the key trends in the data?".to_string(),
                },
                FollowUpQuestion {
                    id: format!("q3-{}", now),
                    text: "How does this compare to industry standards?".to_string(),
                },
            ]),
            chart_data,
        })
    }

    pub async fn generate_chart(
        &self,
        prompt: &str,
        _data: Option<&serde_json::Value>,
    ) -> Result<ChatResponse, ApiError> {
        tokio::time::sleep(self.latency).await;

        let kind = if prompt.to_lowercase().contains("line") {
            ChartKind::Line
        } else {
            ChartKind::Bar
        };
        let mut rng = rand::rng();
        let values: Vec<f64> = (0..MONTHS.len())
            .map(|_| rng.random_range(1..=20) as f64)
            .collect();
        let now = now_millis();

        Ok(ChatResponse {
            message: ChatMessage::assistant(
                format!("chart-{}", now),
                "I've regenerated the chart based on your request.",
                now,
            ),
            follow_up_questions: None,
            chart_data: Some(ChartPayload::Series(SeriesChart {
                kind,
                data: ChartData {
                    labels: MONTHS.iter().map(|m| m.to_string()).collect(),
                    datasets: vec![Dataset {
                        label: Some("Data".to_string()),
                        data: values,
                        background_color: Some(BRAND_FILL.to_string()),
                        border_color: Some(BRAND_STROKE.to_string()),
                    }],
                },
            })),
        })
    }
}
