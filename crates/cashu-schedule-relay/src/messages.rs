//! NIP-01 wire messages exchanged with relays.
//!
//! Only what publishing needs: the client sends `["EVENT", <event>]`, the
//! relay answers `["OK", <id>, <accepted>, <message>]` and may interleave
//! `["NOTICE", <message>]`.

use serde_json::Value;

use cashu_schedule_core::{Event, EventId};

use crate::error::{RelayError, Result};

/// Client to relay.
#[derive(Debug, Clone, Copy)]
pub enum ClientMessage<'a> {
    Event(&'a Event),
}

impl ClientMessage<'_> {
    pub fn to_json(&self) -> Result<String> {
        match self {
            ClientMessage::Event(event) => Ok(serde_json::to_string(&("EVENT", event))?),
        }
    }
}

/// Relay to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    Ok {
        event_id: EventId,
        accepted: bool,
        message: String,
    },
    Notice(String),
    /// Any other message type, by name. Not needed for publishing.
    Other(String),
}

impl RelayMessage {
    pub fn from_json(text: &str) -> Result<Self> {
        let fields: Vec<Value> = serde_json::from_str(text)?;
        let name = fields
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::InvalidMessage("expected [<type>, ...]".into()))?;

        match name {
            "OK" => {
                let id = fields
                    .get(1)
                    .and_then(Value::as_str)
                    .ok_or_else(|| RelayError::InvalidMessage("OK without event id".into()))?;
                let event_id = EventId::from_hex(id)
                    .map_err(|e| RelayError::InvalidMessage(format!("OK event id: {e}")))?;
                let accepted = fields
                    .get(2)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| RelayError::InvalidMessage("OK without status".into()))?;
                let message = fields
                    .get(3)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                })
            }
            "NOTICE" => Ok(RelayMessage::Notice(
                fields
                    .get(1)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            )),
            other => Ok(RelayMessage::Other(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "4376c65d2f232afbe9b882a35baa4f6fe8667c4e684749af565f981833ed6a65";

    #[test]
    fn test_parse_ok() {
        let msg = RelayMessage::from_json(&format!("[\"OK\",\"{ID}\",true,\"\"]")).unwrap();
        assert_eq!(
            msg,
            RelayMessage::Ok {
                event_id: EventId::from_hex(ID).unwrap(),
                accepted: true,
                message: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_rejection() {
        let msg = RelayMessage::from_json(&format!(
            "[\"OK\",\"{ID}\",false,\"blocked: not on whitelist\"]"
        ))
        .unwrap();
        assert!(matches!(
            msg,
            RelayMessage::Ok { accepted: false, ref message, .. } if message.starts_with("blocked")
        ));
    }

    #[test]
    fn test_parse_notice_and_other() {
        assert_eq!(
            RelayMessage::from_json("[\"NOTICE\",\"slow down\"]").unwrap(),
            RelayMessage::Notice("slow down".into())
        );
        assert_eq!(
            RelayMessage::from_json("[\"EOSE\",\"sub1\"]").unwrap(),
            RelayMessage::Other("EOSE".into())
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(RelayMessage::from_json("{}").is_err());
        assert!(RelayMessage::from_json("[]").is_err());
        assert!(RelayMessage::from_json("[\"OK\",\"zz\",true]").is_err());
    }
}
