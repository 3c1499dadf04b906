use super::*;
use crate::config::ProviderConfig;

#[test]
fn chat_message_serializes_lowercase_role() {
    let message = ChatMessage::system("be brief");
    let json = serde_json::to_value(&message).expect("serializes");
    assert_eq!(json, serde_json::json!({ "role": "system", "content": "be brief" }));

    let parsed: ChatMessage =
        serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).expect("parses");
    assert_eq!(parsed, ChatMessage::assistant("ok"));
}

#[test]
fn build_models_for_ollama_needs_no_key() {
    let config = Config {
        provider: ProviderConfig::for_kind(ProviderKind::Ollama),
        ..Config::default()
    };

    let (chat, embedder) = build_models(&config, Some("mistral-nemo")).expect("models built");
    assert_eq!(chat.model_name(), "mistral-nemo");
    assert_eq!(embedder.model_name(), "nomic-embed-text:latest");
}

#[test]
fn build_models_rejects_blank_override() {
    let config = Config {
        provider: ProviderConfig::for_kind(ProviderKind::Ollama),
        ..Config::default()
    };

    assert!(matches!(
        build_models(&config, Some("  ")),
        Err(RagError::Config(_))
    ));
}

struct Canned;

impl ChatModel for Canned {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(format!("{} message(s), last: {}", messages.len(), messages[messages.len() - 1].content))
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

impl Embedder for Canned {
    fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(Vec::new())
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

#[test]
fn invoke_sends_a_single_user_message() {
    let answer = Canned.invoke("hello").expect("answered");
    assert_eq!(answer, "1 message(s), last: hello");
}

#[test]
fn embed_query_on_empty_response_is_an_error() {
    assert!(matches!(
        Canned.embed_query("hello"),
        Err(RagError::Provider(_))
    ));
}
