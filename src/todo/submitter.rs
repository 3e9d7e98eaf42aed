//! Creates tasks in a Microsoft To Do list through Microsoft Graph.

use chrono::Local;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::schedule::ReminderSchedule;
use crate::oauth::AccessToken;
use crate::task::{SubmissionOutcome, TaskRecord, TaskSubmissionResult};

/// Default Microsoft Graph base URL.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Time zone label sent with due and reminder times.
pub const DEFAULT_TIME_ZONE: &str = "Eastern Standard Time";

/// Category attached to every generated task.
pub const PARETO_CATEGORY: &str = "Pareto-80/20";

/// Submits task records one by one. Not transactional: a failed record is
/// reported and the remaining records are still sent.
#[derive(Debug, Clone)]
pub struct TaskSubmitter {
    client: Client,
    graph_base_url: String,
    time_zone: String,
}

impl TaskSubmitter {
    pub fn new(client: Client, graph_base_url: &str, time_zone: &str) -> Self {
        Self {
            client,
            graph_base_url: graph_base_url.trim_end_matches('/').to_string(),
            time_zone: time_zone.to_string(),
        }
    }

    fn tasks_url(&self, list_id: &str) -> String {
        format!(
            "{}/me/todo/lists/{}/tasks",
            self.graph_base_url,
            urlencoding::encode(list_id)
        )
    }

    /// Submit `records` in order, due tomorrow at 10:00 local time.
    ///
    /// Returns exactly one result per record, in input order.
    pub async fn submit(
        &self,
        records: &[TaskRecord],
        token: &AccessToken,
        list_id: &str,
    ) -> Vec<TaskSubmissionResult> {
        let schedule = ReminderSchedule::next_day(Local::now().naive_local());
        self.submit_with_schedule(records, token, list_id, schedule)
            .await
    }

    /// Submit `records` in order with a fixed schedule for the whole batch.
    pub async fn submit_with_schedule(
        &self,
        records: &[TaskRecord],
        token: &AccessToken,
        list_id: &str,
        schedule: ReminderSchedule,
    ) -> Vec<TaskSubmissionResult> {
        let url = self.tasks_url(list_id);
        let due = schedule.due_string();
        let reminder = schedule.reminder_string();

        tracing::info!(
            count = records.len(),
            due = %due,
            "Submitting tasks to Microsoft To Do"
        );

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let payload = TodoTaskPayload {
                title: record.title(),
                body: ItemBody {
                    content: record.description(),
                    content_type: "text",
                },
                importance: "high",
                due_date_time: DateTimeTimeZone {
                    date_time: &due,
                    time_zone: &self.time_zone,
                },
                reminder_date_time: DateTimeTimeZone {
                    date_time: &reminder,
                    time_zone: &self.time_zone,
                },
                is_reminder_on: true,
                categories: [PARETO_CATEGORY],
            };

            let outcome = self.create_task(&url, token, &payload).await;
            match &outcome {
                SubmissionOutcome::Created => {
                    tracing::info!(title = %record.title(), "Created task");
                }
                SubmissionOutcome::Failed { reason, .. } => {
                    tracing::warn!(title = %record.title(), "Failed to create task: {}", reason);
                }
            }

            results.push(TaskSubmissionResult {
                record: record.clone(),
                outcome,
            });
        }

        results
    }

    async fn create_task(
        &self,
        url: &str,
        token: &AccessToken,
        payload: &TodoTaskPayload<'_>,
    ) -> SubmissionOutcome {
        let response = match self
            .client
            .post(url)
            .bearer_auth(token.secret())
            .json(payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return SubmissionOutcome::Failed {
                    status: None,
                    reason: format!("Request failed: {}", e),
                }
            }
        };

        let status = response.status();
        if status == StatusCode::CREATED {
            return SubmissionOutcome::Created;
        }

        let reason = match response.text().await {
            Ok(body) if body.is_empty() => format!("HTTP {}", status.as_u16()),
            Ok(body) => format!("HTTP {}: {}", status.as_u16(), body),
            Err(e) => format!("HTTP {} (failed to read body: {})", status.as_u16(), e),
        };
        SubmissionOutcome::Failed {
            status: Some(status.as_u16()),
            reason,
        }
    }
}

/// Graph `todoTask` creation body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TodoTaskPayload<'a> {
    title: &'a str,
    body: ItemBody<'a>,
    importance: &'static str,
    due_date_time: DateTimeTimeZone<'a>,
    reminder_date_time: DateTimeTimeZone<'a>,
    is_reminder_on: bool,
    categories: [&'static str; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content: &'a str,
    content_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateTimeTimeZone<'a> {
    date_time: &'a str,
    time_zone: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockServer, UNREACHABLE_BASE_URL};
    use crate::todo::schedule::parse_graph_date_time;
    use serde_json::json;

    fn records(titles: &[&str]) -> Vec<TaskRecord> {
        titles
            .iter()
            .map(|t| TaskRecord::new(t, &format!("Do {t} [ ] now")).unwrap())
            .collect()
    }

    fn submitter(base_url: &str) -> TaskSubmitter {
        TaskSubmitter::new(Client::new(), base_url, DEFAULT_TIME_ZONE)
    }

    fn token() -> AccessToken {
        AccessToken::new("graph-token", None)
    }

    #[tokio::test]
    async fn sends_fixed_body_fields() {
        let server = MockServer::start(vec![(201, json!({"id": "t1"}))]).await;

        let results = submitter(&server.base_url)
            .submit(&records(&["Outline"]), &token(), "list-1")
            .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].outcome.is_created());

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/me/todo/lists/list-1/tasks");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer graph-token"));

        let body = requests[0].json();
        assert_eq!(body["title"], "Outline");
        assert_eq!(body["body"]["content"], "Do Outline [ ] now");
        assert_eq!(body["body"]["contentType"], "text");
        assert_eq!(body["importance"], "high");
        assert_eq!(body["isReminderOn"], true);
        assert_eq!(body["categories"], json!(["Pareto-80/20"]));
        assert_eq!(body["dueDateTime"]["timeZone"], DEFAULT_TIME_ZONE);
        assert_eq!(body["reminderDateTime"]["timeZone"], DEFAULT_TIME_ZONE);
        assert!(body["dueDateTime"]["dateTime"]
            .as_str()
            .unwrap()
            .ends_with("T10:00:00"));
    }

    #[tokio::test]
    async fn middle_failure_does_not_abort_batch() {
        let server = MockServer::start(vec![
            (201, json!({"id": "a"})),
            (500, json!({"error": {"code": "InternalServerError"}})),
            (201, json!({"id": "c"})),
        ])
        .await;

        let results = submitter(&server.base_url)
            .submit(&records(&["A", "B", "C"]), &token(), "list-1")
            .await;

        assert_eq!(results.len(), 3);
        let titles: Vec<_> = results.iter().map(|r| r.record.title()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert!(results[0].outcome.is_created());
        assert!(results[2].outcome.is_created());
        match &results[1].outcome {
            SubmissionOutcome::Failed { status, reason } => {
                assert_eq!(*status, Some(500));
                assert!(reason.contains("500"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(server.request_count(), 3);
    }

    #[tokio::test]
    async fn only_201_counts_as_created() {
        let server = MockServer::start(vec![(200, json!({"id": "a"}))]).await;

        let results = submitter(&server.base_url)
            .submit(&records(&["A"]), &token(), "list-1")
            .await;
        assert_eq!(
            results[0].outcome,
            SubmissionOutcome::Failed {
                status: Some(200),
                reason: "HTTP 200: {\"id\":\"a\"}".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn batch_shares_due_date_and_reminder_is_an_hour_earlier() {
        let server = MockServer::start((0..4).map(|_| (201, json!({}))).collect()).await;

        submitter(&server.base_url)
            .submit(&records(&["A", "B", "C", "D"]), &token(), "list-1")
            .await;

        let bodies: Vec<_> = server.requests().iter().map(|r| r.json()).collect();
        assert_eq!(bodies.len(), 4);
        let first_due = bodies[0]["dueDateTime"]["dateTime"].clone();
        for body in &bodies {
            assert_eq!(body["dueDateTime"]["dateTime"], first_due);
            let due = parse_graph_date_time(body["dueDateTime"]["dateTime"].as_str().unwrap())
                .unwrap();
            let reminder =
                parse_graph_date_time(body["reminderDateTime"]["dateTime"].as_str().unwrap())
                    .unwrap();
            assert_eq!(due - reminder, chrono::Duration::hours(1));
        }
    }

    #[tokio::test]
    async fn transport_failure_is_reported_per_record() {
        let results = submitter(UNREACHABLE_BASE_URL)
            .submit(&records(&["A", "B"]), &token(), "list-1")
            .await;

        assert_eq!(results.len(), 2);
        for result in &results {
            match &result.outcome {
                SubmissionOutcome::Failed { status, reason } => {
                    assert_eq!(*status, None);
                    assert!(!reason.is_empty());
                }
                other => panic!("expected failure, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn list_id_is_path_encoded() {
        let server = MockServer::start(vec![(201, json!({}))]).await;

        submitter(&server.base_url)
            .submit(&records(&["A"]), &token(), "AAMk/abc=")
            .await;

        assert_eq!(
            server.requests()[0].path,
            "/me/todo/lists/AAMk%2Fabc%3D/tasks"
        );
    }

    #[tokio::test]
    async fn truncated_error_body_is_reported() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request.ends_with(b"}") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\npartial")
                .await
                .unwrap();
        });

        let results = submitter(&base_url)
            .submit(&records(&["Outline"]), &token(), "list-1")
            .await;

        match &results[0].outcome {
            SubmissionOutcome::Failed { status, reason } => {
                assert_eq!(*status, Some(500));
                assert!(reason.contains("failed to read body"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let server = MockServer::start(vec![]).await;
        let results = submitter(&server.base_url)
            .submit(&[], &token(), "list-1")
            .await;
        assert!(results.is_empty());
        assert_eq!(server.request_count(), 0);
    }
}
