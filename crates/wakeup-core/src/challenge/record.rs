//! A single wake-up challenge as served by `/api/challenge`.

use serde::{Deserialize, Serialize};

use crate::alarm::ChallengeType;
use crate::error::ApiError;

/// Prompt and expected answer for one challenge attempt.
///
/// Never cached: a fresh one is fetched every time the challenge screen opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub challenge_type: ChallengeType,
    pub prompt: String,
    pub expected_answer: String,
}

impl ChallengeRecord {
    /// Build from an untrusted `{type, question?, sentence?, answer?}` body.
    ///
    /// Math challenges expect `answer`; sentence challenges expect the
    /// sentence itself. A body that cannot yield both a prompt and an
    /// expected answer is rejected.
    pub fn from_response(requested: ChallengeType, body: &serde_json::Value) -> Result<Self, ApiError> {
        let text = |key: &str| {
            body.get(key)
                .and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.trim().to_string()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
        };

        let challenge_type = body
            .get("type")
            .and_then(|v| v.as_str())
            .and_then(ChallengeType::parse)
            .unwrap_or(requested);

        let question = text("question");
        let sentence = text("sentence");
        let expected_answer = text("answer")
            .or_else(|| sentence.clone())
            .ok_or_else(|| ApiError::Malformed("challenge has no answer".into()))?;

        let prompt = match (challenge_type, question, sentence) {
            (ChallengeType::Math, Some(q), _) => format!("Solve: {q}"),
            (ChallengeType::Sentence, _, Some(s)) => format!("Type exactly: {s}"),
            (_, Some(q), _) => format!("Solve: {q}"),
            (_, None, Some(s)) => format!("Type exactly: {s}"),
            (_, None, None) => return Err(ApiError::Malformed("challenge has no prompt".into())),
        };

        Ok(Self {
            challenge_type,
            prompt,
            expected_answer,
        })
    }

    /// Exact, case-sensitive match after trimming surrounding whitespace.
    pub fn accepts(&self, answer: &str) -> bool {
        answer.trim() == self.expected_answer.trim()
    }
}
