//! Defines the WebSocket message protocol between the browser client and the API server.

use dataready_core::orchestrator::{FollowupPrompt, QuestionPrompt};
use dataready_core::report::InterviewReport;
use serde::{Deserialize, Serialize};

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Begin the interview, asking the first question.
    Start,
    /// The transcribed answer to the current question.
    Response { transcript: String },
    /// Skip the current question without answering.
    Skip,
    /// End the interview early and receive the report.
    End,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the socket is bound to an existing session.
    Connected { session_id: String, state: String },
    /// Emitted on every committed state-machine transition.
    StateChange { from: String, to: String },
    /// A new core question to present.
    Question { question: QuestionPrompt },
    /// A follow-up probe on the current question.
    Followup { followup: FollowupPrompt },
    /// The interview ran to completion; final report attached.
    Complete { report: InterviewReport },
    /// The interview was ended early; partial report attached.
    Ended { report: InterviewReport },
    /// Reports an error to the client.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_by_type_tag() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "start"}"#).unwrap(),
            ClientMessage::Start
        ));
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "response", "transcript": "my answer"}"#).unwrap();
        let ClientMessage::Response { transcript } = msg else {
            panic!("expected response message");
        };
        assert_eq!(transcript, "my answer");
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "skip"}"#).unwrap(),
            ClientMessage::Skip
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "end"}"#).unwrap(),
            ClientMessage::End
        ));
    }

    #[test]
    fn unknown_client_message_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "dance"}"#).is_err());
    }

    #[test]
    fn server_messages_carry_type_tags() {
        let json = serde_json::to_value(ServerMessage::StateChange {
            from: "ready".to_string(),
            to: "asking".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "state_change");
        assert_eq!(json["from"], "ready");

        let json = serde_json::to_value(ServerMessage::Error {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
    }
}
