use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ProgrammingLanguage;

/// Speaker of one line in a tutor conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Tutor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn tutor(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tutor,
            content: content.into(),
        }
    }
}

/// What a conversation is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMode {
    /// Beginner questions about one lesson.
    Lesson { title: String },
    /// Mock technical interview.
    Interviewer,
}

impl ChatMode {
    /// Opening line the tutor speaks before the learner types anything.
    #[must_use]
    pub fn greeting(&self, language: Option<ProgrammingLanguage>) -> Option<String> {
        match self {
            ChatMode::Lesson { .. } => None,
            ChatMode::Interviewer => {
                let focus = language.map_or("programming", ProgrammingLanguage::display_name);
                Some(format!(
                    "Welcome to the Technical Interview room. I'm your host, CodeSage. \
                     We'll be focusing on {focus}. Are you ready to start the simulation?"
                ))
            }
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Lesson { title } => write!(f, "tutor chat on {title}"),
            ChatMode::Interviewer => f.write_str("mock interview"),
        }
    }
}
