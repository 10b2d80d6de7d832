//! Model-backed assessments.
//!
//! The requester sends one prompt, pulls a JSON object out of the reply and
//! checks its shape. Bad replies are retried a fixed number of times with a
//! fixed delay; after that the payload's neutral fallback is returned, marked
//! as [`Assessed::Fallback`] so callers never mistake it for a real finding.

pub mod extract;
pub mod generator;
pub mod payload;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub use extract::{clean_comment, extract_json, AssessmentError};
pub use generator::{OpenAiGenerator, TextGenerator};
pub use payload::{Assessable, ConclusionAssessment, DistributionAssessment, ItemAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Outcome of a request: a validated answer or the neutral fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessed<T> {
    Valid(T),
    Fallback(T),
}

impl<T> Assessed<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Assessed::Valid(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Assessed::Valid(value) | Assessed::Fallback(value) => value,
        }
    }
}

pub struct AssessmentRequester {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl AssessmentRequester {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    /// Ask for a `T`. Never fails; exhausting the retries yields the fallback.
    pub async fn request<T: Assessable>(
        &self,
        label: &str,
        prompt: &str,
        system_instruction: &str,
    ) -> Assessed<T> {
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            match self.attempt::<T>(prompt, system_instruction).await {
                Ok(value) => {
                    debug!("{} assessment for {} accepted on attempt {}", T::KIND, label, attempt);
                    return Assessed::Valid(value);
                }
                Err(e) => {
                    warn!(
                        "{} assessment for {} failed (attempt {}/{}): {}",
                        T::KIND, label, attempt, attempts, e
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        error!("{} assessment for {} fell back after {} attempts", T::KIND, label, attempts);
        Assessed::Fallback(T::fallback())
    }

    async fn attempt<T: Assessable>(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<T, AssessmentError> {
        let text = self
            .generator
            .generate(prompt, system_instruction)
            .await
            .map_err(|e| AssessmentError::Generation(e.to_string()))?;
        let json = extract_json(&text)?;
        T::from_json(json)
    }
}

#[cfg(test)]
pub mod mock {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::TextGenerator;
    use crate::types::AuditError;

    /// Replays scripted replies in order, then repeats `default`
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, String>>>,
        default: Result<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                default: Err("no scripted reply".to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        /// Answer every prompt with `reply`
        pub fn always(reply: &str) -> Self {
            let mut generator = Self::new(vec![]);
            generator.default = Ok(reply.to_string());
            generator
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, AuditError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());
            next.map_err(AuditError::Generation)
        }
    }
}
