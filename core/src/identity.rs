/// Who we are, who we talk to, and the credential we talk with
use serde::{Deserialize, Serialize};
use std::fmt;

/// The current user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelfIdentity {
    pub id: String,
}

impl SelfIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The counterpart of the selected conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationIdentity {
    pub id: String,
    pub display_name: String,
}

impl ConversationIdentity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Selection state of the chat surface.
///
/// A conversation can be selected before its identifier has resolved; until it
/// is `Confirmed` no live event can be attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    Unselected,
    Pending {
        display_name: String,
    },
    Confirmed(ConversationIdentity),
}

impl Binding {
    /// Resolved counterpart id, if any
    pub fn confirmed_id(&self) -> Option<&str> {
        match self {
            Binding::Confirmed(identity) => Some(identity.id.as_str()),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&ConversationIdentity> {
        match self {
            Binding::Confirmed(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Binding::Unselected => "",
            Binding::Pending { display_name } => display_name.as_str(),
            Binding::Confirmed(identity) => identity.display_name.as_str(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Binding::Confirmed(_))
    }
}

/// Bearer token for the message store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "Credential({}…)", visible)
    }
}
