//! Topic validation at the HTTP boundary
//!
//! The file layer uses topics verbatim as file names, so anything that could
//! escape its directory or collide with its staging files is rejected here.

use crate::error::{Result, ServerError};

const MAX_TOPIC_LEN: usize = 255;

pub fn validate_topic(topic: &str) -> Result<()> {
    let reason = if topic.is_empty() {
        "must not be empty"
    } else if topic.len() > MAX_TOPIC_LEN {
        "must be at most 255 bytes"
    } else if topic.starts_with('.') {
        "must not start with '.'"
    } else if topic.contains(['/', '\\']) {
        "must not contain path separators"
    } else if topic.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };

    Err(ServerError::InvalidTopic(format!("{:?} {}", topic, reason)))
}
