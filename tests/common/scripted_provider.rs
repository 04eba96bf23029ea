//! [`LlmProvider`] that answers from a script.

use async_trait::async_trait;
use jobscout::llm::{LlmError, LlmProvider};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Reply = Result<Option<String>, LlmError>;
type Responder = dyn Fn(&str) -> Reply + Send + Sync;

/// Replies are taken from the queued script first; once it runs out, the
/// responder decides based on the prompt.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Reply>>,
    responder: Box<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn replying(responder: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn always(text: &str) -> Self {
        let text = text.to_string();
        Self::replying(move |_| Ok(Some(text.clone())))
    }

    /// Queue replies served before the responder is consulted.
    pub fn then(self, replies: Vec<Reply>) -> Self {
        self.script.lock().unwrap().extend(replies);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "fixture"
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let queued = self.script.lock().unwrap().pop_front();
        match queued {
            Some(reply) => reply,
            None => (self.responder)(prompt),
        }
    }
}
