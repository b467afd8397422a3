//! Admin-side data layer: talks to the `/api` endpoints, keeps a local
//! mirror for offline use and announces changes per resource kind.

pub mod api_client;
pub mod cache;
pub mod events;
pub mod local_store;
pub mod seed;

pub use api_client::{ClientError, HttpResourceApi, ResourceApi, UploadReceipt};
pub use cache::{load_activity_log, FormGuard, LoadSource, ResourceCache, SyncState, Tracked};
pub use events::{ChangeEvent, ChangeNotifier, ChangeType};
pub use local_store::{FileLocalStore, LocalStore, MemoryLocalStore};
