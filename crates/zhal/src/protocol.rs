//! Wire-level field names and message shapes exchanged with ZigbeeCore.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::address::RequestId;

/// Field carrying the correlation id on requests and responses.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// Synchronous acknowledgement returned on the command connection.
///
/// A zero `result_code` means ZigbeeCore accepted the command for
/// asynchronous processing. It says nothing about the command's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// Zero on acceptance; any other value is a rejection.
    pub result_code: i64,
}

impl Ack {
    /// Whether ZigbeeCore accepted the command.
    #[must_use]
    pub const fn accepted(self) -> bool {
        self.result_code == 0
    }
}

/// Extracts the correlation id from an inbound frame.
///
/// Frames without a numeric `requestId` are unsolicited events.
pub(crate) fn request_id_of(frame: &Value) -> Option<RequestId> {
    frame
        .get(REQUEST_ID_FIELD)
        .and_then(Value::as_u64)
        .map(RequestId::new)
}

/// Stamps `request_id` onto an outbound command document.
pub(crate) fn stamp_request_id(mut fields: Map<String, Value>, request_id: RequestId) -> Value {
    fields.insert(REQUEST_ID_FIELD.to_owned(), Value::from(request_id.get()));
    Value::Object(fields)
}
