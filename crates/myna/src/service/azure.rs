use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{ServiceError, ServiceResult};
use crate::models::event::RunEvent;
use crate::models::message::{Role, ThreadMessage};
use crate::models::run::Run;
use crate::models::thread::Thread;
use crate::service::base::{Assistant, AssistantService, NewAssistant, RunEventStream};
use crate::service::sse::{SseDecoder, SseRecord};

pub const DEFAULT_API_VERSION: &str = "2024-05-01-preview";

/// Connection settings for an Azure OpenAI resource.
#[derive(Debug, Clone)]
pub struct AzureServiceConfig {
    /// Base URL of the resource, e.g. `https://myres.openai.azure.com`.
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

/// `AssistantService` over the Azure OpenAI assistants REST surface.
///
/// Every call is a plain HTTPS request authenticated with the resource
/// `api-key` header; run subscriptions ride the same surface with
/// `"stream": true` and an SSE response body.
pub struct AzureAssistantService {
    client: Client,
    config: AzureServiceConfig,
}

impl AzureAssistantService {
    pub fn new(config: AzureServiceConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/openai/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            path,
            self.config.api_version
        )
    }

    async fn post(&self, path: &str, payload: Value) -> ServiceResult<Value> {
        let response = self
            .client
            .post(self.url(path))
            .header("api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        into_json(response).await
    }

    async fn get(&self, path: &str) -> ServiceResult<Value> {
        let response = self
            .client
            .get(self.url(path))
            .header("api-key", &self.config.api_key)
            .send()
            .await?;
        into_json(response).await
    }
}

#[async_trait]
impl AssistantService for AzureAssistantService {
    async fn create_assistant(&self, req: NewAssistant) -> ServiceResult<Assistant> {
        let mut payload = json!({
            "model": req.model,
            "instructions": req.instructions,
            "temperature": 1,
            "top_p": 1,
        });
        if let Some(vector_store_id) = &req.vector_store_id {
            payload["tools"] = json!([{"type": "file_search"}]);
            payload["tool_resources"] = json!({
                "file_search": {"vector_store_ids": [vector_store_id]}
            });
        }
        decode(self.post("assistants", payload).await?)
    }

    async fn create_thread(&self) -> ServiceResult<Thread> {
        decode(self.post("threads", json!({})).await?)
    }

    async fn add_message(&self, thread_id: &str, role: Role, content: &str) -> ServiceResult<()> {
        self.post(
            &format!("threads/{thread_id}/messages"),
            json!({"role": role, "content": content}),
        )
        .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> ServiceResult<Run> {
        decode(
            self.post(
                &format!("threads/{thread_id}/runs"),
                json!({"assistant_id": assistant_id}),
            )
            .await?,
        )
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<Run> {
        decode(self.get(&format!("threads/{thread_id}/runs/{run_id}")).await?)
    }

    async fn list_messages(&self, thread_id: &str) -> ServiceResult<Vec<ThreadMessage>> {
        let list: MessageList = decode(self.get(&format!("threads/{thread_id}/messages")).await?)?;
        Ok(list.data)
    }

    async fn stream_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> ServiceResult<RunEventStream> {
        let response = self
            .client
            .post(self.url(&format!("threads/{thread_id}/runs")))
            .header("api-key", &self.config.api_key)
            .json(&json!({"assistant_id": assistant_id, "stream": true}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let mut body = response.bytes_stream();
        let events = try_stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                for record in decoder.feed(&chunk) {
                    for event in decode_record(&record)? {
                        yield event;
                    }
                }
            }
        };
        Ok(Box::pin(events))
    }
}

/// Wrapper around the service's `{"object": "list", "data": [...]}`
/// message listing.
#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

async fn into_json(response: reqwest::Response) -> ServiceResult<Value> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ServiceResult<T> {
    serde_json::from_value(value).map_err(|err| ServiceError::Payload(err.to_string()))
}

/// Pull the human-readable message out of an error body, falling back to
/// the raw body when it is not the usual `{"error": {"message": ...}}`.
fn extract_error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .map(String::from)
    });
    match message {
        Some(message) => message,
        None => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "unknown error".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Map one SSE record onto relay-relevant run events. Unrecognized event
/// types decode to nothing.
fn decode_record(record: &SseRecord) -> ServiceResult<Vec<RunEvent>> {
    match record.event.as_str() {
        "thread.message.delta" => {
            let data: Value = serde_json::from_str(&record.data)
                .map_err(|err| ServiceError::Payload(format!("bad message delta: {err}")))?;
            Ok(delta_texts(&data)
                .into_iter()
                .map(|text| RunEvent::MessageDelta { text })
                .collect())
        }
        "thread.run.completed" => Ok(vec![RunEvent::Completed]),
        "thread.run.failed" => {
            let message = serde_json::from_str::<Value>(&record.data)
                .ok()
                .and_then(|data| {
                    data.get("last_error")
                        .and_then(|error| error.get("message"))
                        .and_then(Value::as_str)
                        .map(String::from)
                })
                .unwrap_or_else(|| "Unknown error".to_string());
            Ok(vec![RunEvent::Failed { message }])
        }
        "thread.run.requires_action" => Ok(vec![RunEvent::RequiresAction]),
        _ => Ok(Vec::new()),
    }
}

/// Text fragments inside a `thread.message.delta` payload, in order.
fn delta_texts(data: &Value) -> Vec<String> {
    data.get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|block| {
                    block
                        .get("text")
                        .and_then(|text| text.get("value"))
                        .and_then(Value::as_str)
                })
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_for(server: &MockServer) -> AzureAssistantService {
        AzureAssistantService::new(AzureServiceConfig {
            endpoint: server.uri(),
            api_key: "test-key".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_thread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/threads"))
            .and(query_param("api-version", DEFAULT_API_VERSION))
            .and(header("api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "thread_abc123",
                "object": "thread",
                "created_at": 1699000000
            })))
            .mount(&server)
            .await;

        let thread = service_for(&server).await.create_thread().await.unwrap();
        assert_eq!(thread.id, "thread_abc123");
        assert_eq!(thread.created_at, 1699000000);
    }

    #[tokio::test]
    async fn test_create_assistant_with_vector_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/assistants"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4.1-mini",
                "tools": [{"type": "file_search"}],
                "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "asst_9",
                "object": "assistant",
                "model": "gpt-4.1-mini"
            })))
            .mount(&server)
            .await;

        let assistant = service_for(&server)
            .await
            .create_assistant(NewAssistant {
                model: "gpt-4.1-mini".to_string(),
                instructions: "Be brief.".to_string(),
                vector_store_id: Some("vs_1".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(assistant.id, "asst_9");
        assert_eq!(assistant.model, "gpt-4.1-mini");
    }

    #[tokio::test]
    async fn test_add_message_posts_role_and_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/threads/thread_1/messages"))
            .and(body_partial_json(serde_json::json!({
                "role": "user",
                "content": "hi there"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "object": "thread.message"
            })))
            .expect(1)
            .mount(&server)
            .await;

        service_for(&server)
            .await
            .add_message("thread_1", Role::User, "hi there")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_run_decodes_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openai/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "run_1",
                "object": "thread.run",
                "status": "in_progress",
                "last_error": null
            })))
            .mount(&server)
            .await;

        let run = service_for(&server)
            .await
            .get_run("thread_1", "run_1")
            .await
            .unwrap();
        assert_eq!(run.id, "run_1");
        assert!(!run.status.is_terminal());
    }

    #[tokio::test]
    async fn test_list_messages_unwraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openai/threads/thread_1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {
                        "id": "msg_2",
                        "role": "assistant",
                        "content": [{"type": "text", "text": {"value": "Hello!", "annotations": []}}]
                    },
                    {
                        "id": "msg_1",
                        "role": "user",
                        "content": [{"type": "text", "text": {"value": "Hi", "annotations": []}}]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let messages = service_for(&server)
            .await
            .list_messages("thread_1")
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), "Hello!");
    }

    #[tokio::test]
    async fn test_api_errors_surface_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/threads"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"code": "401", "message": "Access denied due to invalid subscription key"}
            })))
            .mount(&server)
            .await;

        let err = service_for(&server).await.create_thread().await.unwrap_err();
        match err {
            ServiceError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid subscription key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_run_decodes_the_event_feed() {
        let server = MockServer::start().await;
        let feed = concat!(
            "event: thread.run.created\n",
            "data: {\"id\": \"run_1\", \"status\": \"queued\"}\n\n",
            "event: thread.message.delta\n",
            "data: {\"delta\": {\"content\": [{\"index\": 0, \"type\": \"text\", \"text\": {\"value\": \"Hel\"}}]}}\n\n",
            "event: thread.message.delta\n",
            "data: {\"delta\": {\"content\": [{\"index\": 0, \"type\": \"text\", \"text\": {\"value\": \"lo\"}}]}}\n\n",
            "event: thread.run.completed\n",
            "data: {\"id\": \"run_1\", \"status\": \"completed\"}\n\n",
            "event: done\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/openai/threads/thread_1/runs"))
            .and(body_partial_json(serde_json::json!({
                "assistant_id": "asst_1",
                "stream": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(feed.as_bytes().to_vec(), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let mut stream = service_for(&server)
            .await
            .stream_run("thread_1", "asst_1")
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }
        assert_eq!(
            events,
            vec![
                RunEvent::MessageDelta {
                    text: "Hel".to_string()
                },
                RunEvent::MessageDelta {
                    text: "lo".to_string()
                },
                RunEvent::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_run_surfaces_run_failure() {
        let server = MockServer::start().await;
        let feed = concat!(
            "event: thread.run.failed\n",
            "data: {\"id\": \"run_1\", \"status\": \"failed\", \"last_error\": {\"code\": \"rate_limit_exceeded\", \"message\": \"Rate limit reached\"}}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/openai/threads/thread_1/runs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(feed.as_bytes().to_vec(), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let mut stream = service_for(&server)
            .await
            .stream_run("thread_1", "asst_1")
            .await
            .unwrap();
        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(
            event,
            RunEvent::Failed {
                message: "Rate limit reached".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_stream_run_rejects_error_status_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/threads/thread_1/runs"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"message": "No thread found with id 'thread_1'."}
            })))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .await
            .stream_run("thread_1", "asst_1")
            .await
            .err()
            .unwrap();
        match err {
            ServiceError::Api { status, .. } => assert_eq!(status, 404),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_record_ignores_unknown_events() {
        let record = SseRecord {
            event: "thread.run.step.created".to_string(),
            data: "{}".to_string(),
        };
        assert!(decode_record(&record).unwrap().is_empty());
    }

    #[test]
    fn test_decode_record_flags_malformed_delta() {
        let record = SseRecord {
            event: "thread.message.delta".to_string(),
            data: "not json".to_string(),
        };
        assert!(matches!(
            decode_record(&record),
            Err(ServiceError::Payload(_))
        ));
    }

    #[test]
    fn test_failed_record_without_details_uses_fallback() {
        let record = SseRecord {
            event: "thread.run.failed".to_string(),
            data: "{\"id\": \"run_1\"}".to_string(),
        };
        assert_eq!(
            decode_record(&record).unwrap(),
            vec![RunEvent::Failed {
                message: "Unknown error".to_string()
            }]
        );
    }

    #[test]
    fn test_extract_error_message_falls_back_to_raw_body() {
        assert_eq!(extract_error_message("plain failure"), "plain failure");
        assert_eq!(extract_error_message(""), "unknown error");
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "nope"}}"#),
            "nope"
        );
    }
}
