pub mod config;
pub mod descriptors;
pub mod endpoint;
mod error;
#[cfg(feature = "functionfs")]
pub mod ffs;
mod lifecycle;
mod poller;
mod transport;
mod worker;

pub use config::{Backend, GadgetConfig};
pub use endpoint::{Completion, Endpoint, QueueError, RequestStatus, UsbRequest};
pub use error::GadgetError;
pub use lifecycle::FunctionController;
pub use poller::MediaPoller;
pub use transport::{BulkTransport, CommandStatus, DispatchReport};
pub use worker::{CommandWorker, Work};
