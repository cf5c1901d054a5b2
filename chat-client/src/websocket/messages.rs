use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames of the `graphql-transport-ws` protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolMessage {
   ConnectionInit {
      #[serde(default, skip_serializing_if = "Option::is_none")]
      payload: Option<Value>,
   },
   ConnectionAck {
      #[serde(default, skip_serializing_if = "Option::is_none")]
      payload: Option<Value>,
   },
   Ping {
      #[serde(default, skip_serializing_if = "Option::is_none")]
      payload: Option<Value>,
   },
   Pong {
      #[serde(default, skip_serializing_if = "Option::is_none")]
      payload: Option<Value>,
   },
   Subscribe {
      id: String,
      payload: SubscribePayload,
   },
   Next {
      id: String,
      payload: ExecutionResult,
   },
   Error {
      id: String,
      payload: Value,
   },
   Complete {
      id: String,
   },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribePayload {
   pub query: String,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub variables: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
   #[serde(default)]
   pub data: Option<Value>,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub errors: Option<Value>,
}

impl ProtocolMessage {
   pub fn subscribe(id: &str, query: &str) -> Self {
      ProtocolMessage::Subscribe {
         id: id.to_string(),
         payload: SubscribePayload {
            query: query.to_string(),
            variables: None,
         },
      }
   }
}
