// Recording catalog for specdiv: clips stored under explicit (user, machine, timestamp) keys.

pub mod catalog;
pub mod error;
pub mod key;

pub use catalog::{RecordingEntry, RecordingStore};
pub use error::StoreError;
pub use key::RecordingKey;
