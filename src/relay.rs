//! Message relay: one inbound text, one completion call, one reply.

use tracing::{error, info};

use crate::markdown;
use crate::openai::{self, Message};
use crate::prompt;

/// Fixed apology sent when anything in the relay path fails.
pub const APOLOGY: &str = "Произошла ошибка при обработке вашего запроса.";

/// Completion backend seam. Implemented by [`openai::Client`]; tests
/// substitute a fake that records the prompt and scripts the outcome.
pub trait ChatCompletion {
    fn chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: Option<f32>,
    ) -> impl Future<Output = Result<String, openai::Error>> + Send;
}

impl ChatCompletion for openai::Client {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: Option<f32>,
    ) -> Result<String, openai::Error> {
        openai::Client::chat(self, model, messages, temperature).await
    }
}

/// Outbound side of one handler invocation: where the reply (or apology) goes.
pub trait ReplySink {
    /// Send with the platform's lightweight-markup rendering mode.
    fn send_markdown(&self, text: &str) -> impl Future<Output = Result<i64, String>> + Send;
    /// Send without a parse mode, so the text can never fail to render.
    fn send_plain(&self, text: &str) -> impl Future<Output = Result<i64, String>> + Send;
}

pub struct Relay<C> {
    api: C,
    model: String,
    temperature: Option<f32>,
    soften_markdown: bool,
}

impl<C: ChatCompletion + Sync> Relay<C> {
    pub fn new(api: C, model: String, temperature: Option<f32>, soften_markdown: bool) -> Self {
        Self {
            api,
            model,
            temperature,
            soften_markdown,
        }
    }

    /// Build the two-entry prompt, issue one completion call, and soften the
    /// returned Markdown when configured to.
    pub async fn respond(&self, text: &str) -> Result<String, openai::Error> {
        let messages = prompt::build_messages(text);
        let reply = self.api.chat(&self.model, &messages, self.temperature).await?;

        Ok(if self.soften_markdown {
            markdown::soften(&reply)
        } else {
            reply
        })
    }

    /// Full relay cycle for one inbound message: exactly one reply is
    /// attempted, either the completion text or the fixed apology. All
    /// failures are terminal here; nothing is re-raised or retried.
    pub async fn handle<S: ReplySink + Sync>(&self, text: &str, sink: &S) {
        let preview: String = text.chars().take(100).collect();
        info!("Relaying message: \"{preview}\"");

        match self.respond(text).await {
            Ok(reply) => {
                if let Err(e) = sink.send_markdown(&reply).await {
                    error!("Failed to deliver reply for \"{preview}\": {e}");
                    self.apologize(sink).await;
                }
            }
            Err(e) => {
                error!("Relay failed for \"{preview}\": {e}");
                self.apologize(sink).await;
            }
        }
    }

    /// Best-effort apology. A failure here is logged and swallowed; there is
    /// no secondary fallback.
    async fn apologize<S: ReplySink + Sync>(&self, sink: &S) {
        if let Err(e) = sink.send_plain(APOLOGY).await {
            error!("Failed to send apology: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};
    use tracing_subscriber::prelude::*;

    use super::*;
    use crate::openai::Role;
    use crate::prompt::SYSTEM_PROMPT;

    enum Outcome {
        Reply(&'static str),
        ConnectionFault,
        NoChoices,
    }

    struct MockApi {
        outcome: Outcome,
        calls: Mutex<Vec<Vec<Message>>>,
    }

    impl MockApi {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatCompletion for MockApi {
        async fn chat(
            &self,
            _model: &str,
            messages: &[Message],
            _temperature: Option<f32>,
        ) -> Result<String, openai::Error> {
            self.calls.lock().unwrap().push(messages.to_vec());
            match self.outcome {
                Outcome::Reply(text) => Ok(text.to_string()),
                Outcome::ConnectionFault => {
                    Err(openai::Error::Http("connection refused".to_string()))
                }
                Outcome::NoChoices => Err(openai::Error::Empty),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        markdown: Mutex<Vec<String>>,
        plain: Mutex<Vec<String>>,
        fail_markdown: bool,
    }

    impl ReplySink for RecordingSink {
        async fn send_markdown(&self, text: &str) -> Result<i64, String> {
            if self.fail_markdown {
                return Err("can't parse entities".to_string());
            }
            self.markdown.lock().unwrap().push(text.to_string());
            Ok(1)
        }

        async fn send_plain(&self, text: &str) -> Result<i64, String> {
            self.plain.lock().unwrap().push(text.to_string());
            Ok(2)
        }
    }

    fn relay(outcome: Outcome) -> Relay<MockApi> {
        Relay::new(
            MockApi::new(outcome),
            "gpt-3.5-turbo".to_string(),
            Some(0.7),
            true,
        )
    }

    struct ErrorCount(std::sync::Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for ErrorCount {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::ERROR {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Run `f` with a subscriber counting error-severity events.
    fn count_error_events<F: FnOnce()>(f: F) -> usize {
        let errors = std::sync::Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCount(errors.clone()));
        tracing::subscriber::with_default(subscriber, f);
        errors.load(Ordering::Relaxed)
    }

    #[tokio::test]
    async fn test_exactly_one_call_with_user_text_verbatim() {
        let relay = relay(Outcome::Reply("**Hej!**"));
        let sink = RecordingSink::default();

        relay.handle("привет", &sink).await;

        let calls = relay.api.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "привет");
    }

    #[tokio::test]
    async fn test_reply_is_softened_first_choice() {
        let relay = relay(Outcome::Reply("**Hej!**"));
        let sink = RecordingSink::default();

        relay.handle("привет", &sink).await;

        assert_eq!(*sink.markdown.lock().unwrap(), vec!["*Hej!*"]);
        assert!(sink.plain.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_softening_disabled_passes_text_through() {
        let relay = Relay::new(
            MockApi::new(Outcome::Reply("**Hej!**")),
            "gpt-3.5-turbo".to_string(),
            None,
            false,
        );
        let sink = RecordingSink::default();

        relay.handle("привет", &sink).await;

        assert_eq!(*sink.markdown.lock().unwrap(), vec!["**Hej!**"]);
    }

    #[tokio::test]
    async fn test_connection_fault_sends_single_apology() {
        let relay = relay(Outcome::ConnectionFault);
        let sink = RecordingSink::default();

        relay.handle("привет", &sink).await;

        assert!(sink.markdown.lock().unwrap().is_empty());
        assert_eq!(*sink.plain.lock().unwrap(), vec![APOLOGY]);
    }

    #[tokio::test]
    async fn test_zero_choices_sends_single_apology() {
        let relay = relay(Outcome::NoChoices);
        let sink = RecordingSink::default();

        relay.handle("привет", &sink).await;

        assert!(sink.markdown.lock().unwrap().is_empty());
        assert_eq!(*sink.plain.lock().unwrap(), vec![APOLOGY]);
    }

    #[tokio::test]
    async fn test_failed_send_falls_back_to_apology() {
        let relay = relay(Outcome::Reply("**Hej!**"));
        let sink = RecordingSink {
            fail_markdown: true,
            ..Default::default()
        };

        relay.handle("привет", &sink).await;

        assert!(sink.markdown.lock().unwrap().is_empty());
        assert_eq!(*sink.plain.lock().unwrap(), vec![APOLOGY]);
    }

    #[test]
    fn test_fault_outcomes_log_exactly_one_error() {
        for outcome in [Outcome::ConnectionFault, Outcome::NoChoices] {
            let relay = relay(outcome);
            let sink = RecordingSink::default();

            let errors = count_error_events(|| {
                futures::executor::block_on(relay.handle("привет", &sink));
            });

            assert_eq!(errors, 1);
            assert_eq!(*sink.plain.lock().unwrap(), vec![APOLOGY]);
        }
    }

    #[test]
    fn test_success_path_logs_no_error() {
        let relay = relay(Outcome::Reply("**Hej!**"));
        let sink = RecordingSink::default();

        let errors = count_error_events(|| {
            futures::executor::block_on(relay.handle("привет", &sink));
        });

        assert_eq!(errors, 0);
        assert_eq!(sink.markdown.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_respond_returns_softened_text() {
        let relay = relay(Outcome::Reply("**bra** och __fint__"));
        assert_eq!(relay.respond("ок").await.unwrap(), "*bra* och _fint_");
    }
}
