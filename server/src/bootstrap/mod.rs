pub mod reconciler;
pub mod router;
pub mod state;
