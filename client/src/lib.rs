//! Client-side view of a user's credit balance.
//!
//! [`api::CreditsClient`] talks to `/api/credits` over a cookie-backed
//! session. [`hook::CreditHook`] wraps it and publishes the last known
//! balance on a watch channel for UI code. The server stays the only
//! authority; the hook re-reads after every mutation.

pub mod api;
pub mod error;
pub mod hook;
