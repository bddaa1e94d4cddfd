//! Default skip predicate and field producers

use crate::context::{client_ip, request_uri, user_agent};
use crate::field::Field;
use http::{request, response};
use std::time::Duration;

/// Default log message
pub const DEFAULT_LOG_MESSAGE: &str = "request record";

/// ip, method, uri, agent, status, latency
const DEFAULT_FIELD_COUNT: usize = 6;

/// Skip predicate that logs every request
pub fn never_skip(_parts: &request::Parts) -> bool {
    false
}

/// Fields captured before the downstream service runs
///
/// Produces `ip`, `method` and `uri`, plus `agent` when the request carries
/// a non-empty `User-Agent` header. An empty agent is omitted, not logged
/// as an empty string.
pub fn default_pre_handling_fields(parts: &request::Parts) -> Vec<Field> {
    let mut fields = Vec::with_capacity(DEFAULT_FIELD_COUNT);
    fields.push(Field::string("ip", client_ip(parts).to_string()));
    fields.push(Field::string("method", parts.method.as_str()));
    fields.push(Field::string("uri", request_uri(parts)));

    if let Some(agent) = user_agent(parts) {
        fields.push(Field::string("agent", agent));
    }

    fields
}

/// Fields appended once the downstream service has produced a response
pub fn default_post_handling_fields(
    parts: &response::Parts,
    fields: &mut Vec<Field>,
    latency: Duration,
) {
    fields.push(Field::int("status", i64::from(parts.status.as_u16())));
    fields.push(Field::duration("latency", latency));
}
