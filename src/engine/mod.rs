//! Engine module: remote API, policy, observations, cancellation and CLI handling

pub mod arg_parser;
pub mod cancel;
pub mod cli;
pub mod gitlab;
pub mod observe;
pub mod policy;

// Re-export commonly used items
pub use arg_parser::{ArtifactsArgs, Cli, Commands, LogFormat};
pub use cancel::CancelToken;
pub use cli::handle_run;
pub use gitlab::{ApiError, DeleteResponse, GitLabApi, GitLabClient, api_base_url};
pub use observe::{Event, LogObserver, MemoryObserver, Observer};
pub use policy::{Policy, PolicyError, PolicyOpts, matches_any, needs_cleanup};
