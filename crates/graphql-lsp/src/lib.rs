mod conversions;
mod logger;
mod processor;
mod server;

pub use logger::{Logger, TracingLogger};
pub use processor::{FileChangeKind, MessageProcessor};
pub use server::GraphQLLanguageServer;
