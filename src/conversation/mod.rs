pub mod controller;
pub mod store;

pub use controller::{
    ControllerConfig,
    ControllerState,
    ConversationController,
    DEFAULT_SESSION_ID,
    DEFAULT_THINKING_FLOOR,
    GREETING,
};
pub use store::{ MessageStore, Snapshot, SnapshotEntry, StoreError };
