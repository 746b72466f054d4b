//! Push-hub frames.
//!
//! The hub speaks a target/arguments JSON protocol: clients invoke named
//! methods with positional arguments and the hub pushes named events back.
//!
//! ```text
//! client -> hub   {"target":"SendMessage","arguments":["alice","bob","<content>"]}
//! hub -> client   {"target":"ReceiveMessage","arguments":["alice","bob","<content>","<ts>"]}
//! ```

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, Identity, error::Result};

/// Methods a client invokes on the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "arguments")]
pub enum HubInvocation {
    /// Deliver a message: (sender, receiver, content).
    SendMessage(Identity, Identity, String),
    /// Mark every message from `author` to `reader` as read: (reader, author).
    MarkAsRead(Identity, Identity),
}

/// Events the hub pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "arguments")]
pub enum HubEvent {
    /// A message was stored: (sender, receiver, content, timestamp).
    ReceiveMessage(Identity, Identity, String, String),
    /// A reader caught up on an author's messages: (reader, author).
    MessagesRead(Identity, Identity),
}

impl HubInvocation {
    /// Serialize to a JSON frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON frame.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl HubEvent {
    /// Serialize to a JSON frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON frame.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the push event for a stored message.
    pub fn receive(message: &ChatMessage) -> Self {
        Self::ReceiveMessage(
            message.sender.clone(),
            message.receiver.clone(),
            message.content.clone(),
            message.timestamp.clone(),
        )
    }
}
