//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod event;
pub mod calendar;

// Re-export commonly used models
pub use user::{User, NewUser, Role, SignupRequest, LoginRequest, AuthResponse};
pub use event::{
    Event, NewEvent, EventSource, Location, Editability, ManualEventPayload, EventPatch,
    ExternalEvent, ExternalEventPage, PageInfo, EventFilter,
};
pub use calendar::CalendarTokens;
