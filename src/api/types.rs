//! API request and response types

use crate::event::Event;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};

/// Request to create a new tutoring session
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub entry_id: String,
    pub domain: String,
    pub main_objective: String,
}

/// Response with a single session snapshot
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionState,
}

/// Response with a session's ordered timeline
#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub events: Vec<Event>,
}

/// Error payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
