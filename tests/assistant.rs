use async_trait::async_trait;
use docsumma::agent::SummaryError;
use docsumma::chat::{ConversationError, Speaker, TurnStatus};
use docsumma::document::RejectionReason;
use docsumma::extractor::ExtractionError;
use docsumma::service::{GenerateRequest, Part, ServiceError, ServiceResult};
use docsumma::session::Stage;
use docsumma::{AppError, Assistant, Config, Document, ModelService, Status, SummaryLength};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Replays canned replies in order and records every request it receives.
#[derive(Default)]
struct FakeModel {
    replies: Mutex<VecDeque<ServiceResult<Option<String>>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    status_seen: Mutex<Vec<Status>>,
    status: Mutex<Option<watch::Receiver<Status>>>,
    hang: bool,
}

impl FakeModel {
    fn replying(replies: Vec<ServiceResult<Option<String>>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            hang: true,
            ..Default::default()
        })
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn watch(&self, assistant: &Assistant) {
        *self.status.lock().unwrap() = Some(assistant.subscribe());
    }
}

#[async_trait]
impl ModelService for FakeModel {
    async fn generate(&self, request: GenerateRequest) -> ServiceResult<Option<String>> {
        self.requests.lock().unwrap().push(request);
        if let Some(rx) = self.status.lock().unwrap().as_ref() {
            self.status_seen.lock().unwrap().push(rx.borrow().clone());
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

fn assistant(model: &Arc<FakeModel>) -> Assistant {
    Assistant::new(model.clone(), Config::default())
}

fn pdf(bytes: &[u8]) -> Document {
    Document::new("report.pdf", "application/pdf", bytes.to_vec())
}

fn text_of(request: &GenerateRequest) -> String {
    request
        .contents
        .iter()
        .flat_map(|content| &content.parts)
        .filter_map(|part| match part {
            Part::Text(text) => Some(text.as_str()),
            Part::InlineData(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const SUMMARY_JSON: &str =
    r#"{"summary":"It is about foxes.","keyPoints":["fast","brown","jumps"],"mainIdeas":["agility"]}"#;

#[tokio::test]
async fn unsupported_type_is_rejected_without_a_call() {
    let model = FakeModel::replying(vec![]);
    let mut assistant = assistant(&model);

    let err = assistant
        .select_file(Document::new("notes.txt", "text/plain", b"hi".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Rejected(RejectionReason::UnsupportedType { .. })
    ));
    assert!(model.requests().is_empty());
    assert!(assistant.extracted_text().is_none());
    assert_eq!(assistant.status().error(), Some(err.to_string().as_str()));
}

#[tokio::test]
async fn oversized_file_is_rejected_whatever_its_type() {
    let model = FakeModel::replying(vec![]);
    let mut config = Config::default();
    config.upload.max_bytes = 4;
    let mut assistant = Assistant::new(model.clone(), config);

    for mime in ["application/pdf", "application/zip"] {
        let err = assistant
            .select_file(Document::new("big", mime, vec![0; 5]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AppError::Rejected(RejectionReason::TooLarge { size: 5, max: 4 })
        );
    }
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn extracted_text_is_held_verbatim() {
    let reply = "  Line one\n\nLine two  \n";
    let model = FakeModel::replying(vec![Ok(Some(reply.to_string()))]);
    let mut assistant = assistant(&model);
    model.watch(&assistant);

    assert!(!assistant.can_summarize());
    let text = assistant.select_file(pdf(b"%PDF-1.7")).await.unwrap();
    assert_eq!(text, reply);
    assert_eq!(assistant.extracted_text(), Some(reply));
    assert!(assistant.can_summarize());
    assert_eq!(assistant.status(), Status::Ready(Stage::Extracting));

    let seen = model.status_seen.lock().unwrap().clone();
    assert_eq!(seen, vec![Status::Loading(Stage::Extracting)]);

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert!(matches!(
        &requests[0].contents[0].parts[0],
        Part::InlineData(blob) if blob.mime_type == "application/pdf" && blob.data == "JVBERi0xLjc="
    ));
}

#[tokio::test]
async fn empty_extraction_reply_is_an_error() {
    let model = FakeModel::replying(vec![Ok(None), Ok(Some("   ".to_string()))]);
    let mut assistant = assistant(&model);

    for _ in 0..2 {
        let err = assistant.select_file(pdf(b"x")).await.unwrap_err();
        assert_eq!(err, AppError::Extraction(ExtractionError::EmptyReply));
        assert!(assistant.extracted_text().is_none());
        assert!(!assistant.can_summarize());
    }
    assert!(assistant
        .status()
        .error()
        .unwrap()
        .starts_with("Failed to extract text."));
}

#[tokio::test]
async fn each_length_sends_one_request_with_its_range() {
    let cases = [
        (SummaryLength::Short, "between 50 and 80 words"),
        (SummaryLength::Medium, "between 120 and 150 words"),
        (SummaryLength::Long, "between 200 and 250 words"),
    ];

    for (length, range_text) in cases {
        let model = FakeModel::replying(vec![
            Ok(Some("The quick brown fox.".to_string())),
            Ok(Some(SUMMARY_JSON.to_string())),
        ]);
        let mut assistant = assistant(&model);
        assistant.select_file(pdf(b"x")).await.unwrap();

        let summary = assistant.generate_summary(length).await.unwrap().clone();
        assert_eq!(summary.summary, "It is about foxes.");
        assert_eq!(summary.key_points, ["fast", "brown", "jumps"]);
        assert_eq!(summary.main_ideas, ["agility"]);

        let requests = model.requests();
        assert_eq!(requests.len(), 2, "one extraction plus one summary");
        let prompt = text_of(&requests[1]);
        assert!(prompt.contains(range_text), "{length}: {prompt}");
        assert!(prompt.contains("The quick brown fox."));

        let schema = requests[1].response_schema.as_ref().unwrap();
        let description = schema["properties"]["summary"]["description"].as_str().unwrap();
        assert!(description.contains(range_text));
    }
}

#[tokio::test]
async fn bad_summary_reply_keeps_previous_summary() {
    let model = FakeModel::replying(vec![
        Ok(Some("text".to_string())),
        Ok(Some(SUMMARY_JSON.to_string())),
        Ok(Some(r#"{"summary":"partial","keyPoints":[]}"#.to_string())),
        Ok(Some("definitely not json".to_string())),
        Ok(None),
    ]);
    let mut assistant = assistant(&model);
    assistant.select_file(pdf(b"x")).await.unwrap();
    let first = assistant
        .generate_summary(SummaryLength::Short)
        .await
        .unwrap()
        .clone();

    for _ in 0..2 {
        let err = assistant
            .generate_summary(SummaryLength::Long)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Summary(SummaryError::InvalidFormat(_))
        ));
        assert_eq!(assistant.summary(), Some(&first));
    }

    let err = assistant
        .generate_summary(SummaryLength::Medium)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Summary(SummaryError::EmptyReply));
    assert_eq!(assistant.summary(), Some(&first));
    assert!(assistant
        .status()
        .error()
        .unwrap()
        .starts_with("Failed to generate summary."));
}

#[tokio::test]
async fn summary_without_text_makes_no_call() {
    let model = FakeModel::replying(vec![]);
    let mut assistant = assistant(&model);

    let err = assistant
        .generate_summary(SummaryLength::Medium)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::NoTextAvailable);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn new_file_resets_previous_results() {
    let model = FakeModel::replying(vec![
        Ok(Some("first document".to_string())),
        Ok(Some(SUMMARY_JSON.to_string())),
        Ok(Some("not json".to_string())),
        Err(ServiceError::Transport("connection reset".to_string())),
    ]);
    let mut assistant = assistant(&model);

    assistant.select_file(pdf(b"one")).await.unwrap();
    assistant.generate_summary(SummaryLength::Short).await.unwrap();
    assistant
        .generate_summary(SummaryLength::Short)
        .await
        .unwrap_err();
    assert!(assistant.status().error().is_some());

    model.watch(&assistant);
    let err = assistant
        .select_file(Document::new("two.png", "image/png", b"two".to_vec()))
        .await
        .unwrap_err();

    // By the time the second extraction was in flight, everything from the first was gone.
    assert_eq!(
        model.status_seen.lock().unwrap().clone(),
        vec![Status::Loading(Stage::Extracting)]
    );
    assert!(assistant.extracted_text().is_none());
    assert!(assistant.summary().is_none());
    assert_eq!(assistant.document().unwrap().name, "two.png");
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn chat_starts_with_a_single_greeting() {
    let model = FakeModel::replying(vec![]);
    let mut assistant = assistant(&model);

    assistant.select_file(pdf(b"x")).await.unwrap_err();
    assistant.toggle_chat();

    let transcript = assistant.chat().unwrap().transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].speaker, Speaker::Assistant);
}

#[tokio::test]
async fn chat_success_appends_two_turns_in_order() {
    let model = FakeModel::replying(vec![Ok(Some("Hi! What can I do?".to_string()))]);
    let mut assistant = assistant(&model);
    assistant.toggle_chat();

    let reply = assistant.send_chat("hello").await.unwrap();
    assert_eq!(reply, "Hi! What can I do?");

    let transcript = assistant.chat().unwrap().transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].speaker, Speaker::User);
    assert_eq!(transcript[1].text, "hello");
    assert_eq!(transcript[2].speaker, Speaker::Assistant);
    assert_eq!(transcript[2].text, "Hi! What can I do?");
    assert_eq!(transcript[2].status, TurnStatus::Delivered);

    let request = &model.requests()[0];
    assert_eq!(
        request.system_instruction.as_deref(),
        Some("You are a friendly and helpful assistant.")
    );
}

#[tokio::test]
async fn chat_failure_still_appends_two_turns() {
    let model = FakeModel::replying(vec![Err(ServiceError::Api {
        status: 503,
        message: "model overloaded".to_string(),
    })]);
    let mut assistant = assistant(&model);

    // Sending without opening the panel first still starts with the greeting.
    let err = assistant.send_chat("hello").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Conversation(ConversationError::Service(ServiceError::Api { status: 503, .. }))
    ));

    let transcript = assistant.chat().unwrap().transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].text, "hello");
    assert_eq!(transcript[2].speaker, Speaker::Assistant);
    assert_eq!(transcript[2].status, TurnStatus::Failed);
    assert!(transcript[2].text.contains("model overloaded"));

    // Chat failures never touch the document status.
    assert_eq!(assistant.status(), Status::Idle);
}

#[tokio::test(start_paused = true)]
async fn hung_call_times_out() {
    let model = FakeModel::hanging();
    let mut config = Config::default();
    config.agent.timeout_secs = 30;
    let mut assistant = Assistant::new(model.clone(), config);

    let err = assistant.select_file(pdf(b"x")).await.unwrap_err();
    assert_eq!(
        err,
        AppError::Extraction(ExtractionError::Service(ServiceError::Timeout(
            Duration::from_secs(30)
        )))
    );
    assert!(!assistant.status().is_loading());
}

#[tokio::test]
async fn cancelled_call_reports_cancellation_and_next_call_proceeds() {
    let model = FakeModel::hanging();
    let mut assistant = assistant(&model);

    let token = assistant.cancellation_token();
    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });
    let err = assistant.select_file(pdf(b"x")).await.unwrap_err();
    cancel.await.unwrap();

    assert_eq!(
        err,
        AppError::Extraction(ExtractionError::Service(ServiceError::Cancelled))
    );
    assert!(!assistant.cancellation_token().is_cancelled());
}
