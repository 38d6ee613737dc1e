pub mod error;
pub mod session;
pub mod snapshot;
pub mod sync;

pub use error::GatewayError;
pub use session::{Session, SessionStore};
pub use snapshot::Snapshot;
pub use sync::{signin, Gateway, Identity, RangeReport};
