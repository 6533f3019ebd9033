// ABOUTME: Library root for the batchpipe processing client
// ABOUTME: Exposes the API client, poll loop, controller and display surface

pub mod config;
pub mod controller;
pub mod error;
pub mod poller;
pub mod remote;
pub mod session;
pub mod view;

pub use config::{ApiConfig, Overrides};
pub use controller::{Controller, SubmitOutcome};
pub use error::ApiError;
pub use poller::{PollOutcome, Poller};
pub use remote::{ApiClient, FileLabel, JobStatus};
pub use session::{JobSession, SeenMessages};
pub use view::{ProgressView, TerminalView};
