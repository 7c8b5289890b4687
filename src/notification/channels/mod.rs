//! 具体渠道实现

pub mod local_file;
pub mod webhook;

pub use local_file::LocalFileChannel;
pub use webhook::WebhookChannel;
