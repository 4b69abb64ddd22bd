//! Integration tests for Promptlab

use pretty_assertions::assert_eq;
use promptlab::commands::{parse_command, LabCommand, Target};
use promptlab::config::save_template;
use promptlab::lab::view::{comparison, transcript, ActionItemsReveal};
use promptlab::{
    ChatProvider, ChatReply, GeminiClient, Lab, LabConfig, LabError, Turn, TurnRole, VariantId,
};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Provider that answers from a queue and remembers every call
struct Scripted {
    replies: Mutex<Vec<promptlab::Result<String>>>,
    calls: Mutex<Vec<(String, usize, String)>>,
}

impl Scripted {
    fn new(replies: Vec<promptlab::Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ChatProvider for Scripted {
    async fn send_message(
        &self,
        system_instruction: &str,
        history: &[Turn],
        message: &str,
    ) -> promptlab::Result<ChatReply> {
        self.calls.lock().unwrap().push((
            system_instruction.to_string(),
            history.len(),
            message.to_string(),
        ));
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(LabError::Provider("script exhausted".into())));
        next.map(|text| ChatReply::new(history, message, text))
    }
}

/// Test a full exchange: context merged into the template, tags extracted
#[tokio::test]
async fn test_round_trip_scenario() {
    let mut lab = Lab::from_config(&LabConfig::default());
    lab.user.name = "Bo".to_string();
    lab.user.set_session_minutes(10);
    lab.user.summaries = "Talked about sleep".to_string();

    let provider = Scripted::new(vec![Ok(
        "<response>Try a wind-down routine.</response>\n<actionitems>- Lights off by 11</actionitems>"
            .to_string(),
    )]);

    lab.send(VariantId::A, "How do I sleep better?", &provider)
        .await
        .unwrap();

    let calls = provider.calls.lock().unwrap();
    let (system, history_len, message) = &calls[0];
    assert_eq!(*history_len, 0);
    assert_eq!(message, "How do I sleep better?");
    assert!(system.starts_with("## CONTEXTUAL INFORMATION\n- User name: Bo\n"));
    assert!(system.contains("- Expected conversation duration: 600 seconds\n"));
    assert!(system.contains("Talked about sleep"));
    assert!(!system.contains("<>Userinfo</>"));

    let a = lab.variant(VariantId::A);
    assert_eq!(a.last_reply, "Try a wind-down routine.");
    assert_eq!(a.last_action_items, "- Lights off by 11");
    assert_eq!(
        ActionItemsReveal::of(a),
        ActionItemsReveal::Items("- Lights off by 11".into())
    );

    let entries = transcript(a);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, TurnRole::User);
    assert_eq!(entries[1].text, "Try a wind-down routine.");
}

/// Test that a failed call leaves everything as it was
#[tokio::test]
async fn test_failed_send_keeps_state() {
    let mut lab = Lab::from_config(&LabConfig::default());
    let provider = Scripted::new(vec![
        Ok("<response>first</response>".to_string()),
        Err(LabError::Network("connection reset".into())),
    ]);

    lab.send(VariantId::B, "one", &provider).await.unwrap();
    let before = lab.variant(VariantId::B).clone();

    let err = lab.send(VariantId::B, "two", &provider).await.unwrap_err();
    assert!(matches!(err, LabError::Network(_)));
    assert_eq!(lab.variant(VariantId::B), &before);
    assert_eq!(lab.history(VariantId::B).len(), 2);
}

/// Test that the two variants keep separate conversations
#[tokio::test]
async fn test_variants_are_independent() {
    let mut lab = Lab::from_config(&LabConfig::default());
    let provider = Scripted::new(vec![
        Ok("<response>A1</response>".to_string()),
        Ok("<response>B1</response><actionitems>walk</actionitems>".to_string()),
        Ok("<response>A2</response>".to_string()),
    ]);

    lab.send(VariantId::A, "hi", &provider).await.unwrap();
    lab.send(VariantId::B, "hi", &provider).await.unwrap();
    lab.send(VariantId::A, "again", &provider).await.unwrap();

    assert_eq!(lab.history(VariantId::A).len(), 4);
    assert_eq!(lab.history(VariantId::B).len(), 2);

    let calls = provider.calls.lock().unwrap();
    assert!(calls[0].0.ends_with("Answer in <=50 words."));
    assert!(calls[1].0.ends_with("end with 🎯."));
    assert_eq!(calls[2].1, 2);

    let view = comparison(&lab);
    assert_eq!(view.columns[0].last_reply, "A2");
    assert_eq!(view.columns[0].action_items, "_No action items found_");
    assert_eq!(view.columns[1].action_items, "walk");
}

/// Test saving a template and loading it back
#[test]
fn test_saved_template_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("promptlab").join("config.toml");
    std::fs::create_dir_all(config_file.parent().unwrap()).unwrap();
    std::fs::write(
        &config_file,
        "# my lab\n[user]\nname = \"Kim\"\nsession_minutes = 15\n",
    )
    .unwrap();

    save_template(&config_file, VariantId::B, "<>Userinfo</>\n\nBe blunt.").unwrap();

    let raw = std::fs::read_to_string(&config_file).unwrap();
    assert!(raw.starts_with("# my lab\n"));

    let config = LabConfig::load(Some(&config_file)).unwrap();
    assert_eq!(config.user_name, "Kim");
    assert_eq!(config.session_minutes, 15);
    assert_eq!(config.template(VariantId::B), "<>Userinfo</>\n\nBe blunt.");
    assert_eq!(config.template(VariantId::A), VariantId::A.default_template());

    let lab = Lab::from_config(&config);
    assert_eq!(lab.variant(VariantId::B).template, "<>Userinfo</>\n\nBe blunt.");
}

/// Test plain-mode command parsing
#[test]
fn test_command_parsing() {
    assert_eq!(
        parse_command("both What should I eat?"),
        Some(LabCommand::Send(Target::Both, "What should I eat?".into()))
    );
    assert_eq!(parse_command("/history a"), Some(LabCommand::History(VariantId::A)));
    assert_eq!(parse_command("/reset"), Some(LabCommand::Reset));
}

/// Serve exactly one canned HTTP response; hands back the raw request.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{addr}/v1beta"), handle)
}

fn test_client(base_url: &str) -> GeminiClient {
    let config = LabConfig::default()
        .with_model("gemini-test")
        .with_api_key_env("PROMPTLAB_TEST_UNSET_KEY");
    GeminiClient::new(&config)
        .with_base_url(base_url)
        .with_api_key("test-key")
}

/// Test the request shape and reply parsing against a local server
#[tokio::test]
async fn test_gemini_client_wire_format() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"<response>Hello</response>"}]},"finishReason":"STOP"}]}"#,
    )
    .await;

    let client = test_client(&base_url);
    let history = vec![Turn::user("earlier"), Turn::model("<response>ok</response>")];
    let reply = client
        .send_message("SYSTEM TEXT", &history, "now")
        .await
        .unwrap();

    assert_eq!(reply.text, "<response>Hello</response>");
    assert_eq!(reply.history.len(), 4);
    assert_eq!(reply.history[2], Turn::user("now"));
    assert_eq!(reply.history[3], Turn::model("<response>Hello</response>"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1beta/models/gemini-test:generateContent"));
    assert!(request.to_ascii_lowercase().contains("x-goog-api-key: test-key"));

    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["systemInstruction"]["parts"][0]["text"], "SYSTEM TEXT");
    assert_eq!(json["contents"].as_array().unwrap().len(), 3);
    assert_eq!(json["contents"][1]["role"], "model");
    assert_eq!(json["contents"][2]["role"], "user");
    assert_eq!(json["contents"][2]["parts"][0]["text"], "now");
}

/// Test that an API error status becomes a provider error with the message
#[tokio::test]
async fn test_gemini_client_api_error() {
    let (base_url, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"code":429,"message":"Quota exceeded"}}"#,
    )
    .await;

    let client = test_client(&base_url);
    let err = client.send_message("sys", &[], "hi").await.unwrap_err();
    server.await.unwrap();

    match err {
        LabError::Provider(msg) => {
            assert!(msg.contains("429"));
            assert!(msg.contains("Quota exceeded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
