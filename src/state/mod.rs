//! State tracked during a run
//!
//! # Components
//!
//! - `HostState`: per-host slot reservation for the interval gate
//! - `ItemState`: where an item identifier is in the resolution pipeline

mod host_state;
mod item_state;

pub use host_state::HostState;
pub use item_state::ItemState;
