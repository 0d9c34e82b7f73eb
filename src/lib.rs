pub mod ansi;
pub mod buffer;
pub mod compact;
pub mod console;
pub mod formatter;
pub mod json;
pub mod logger;
pub mod options;
pub mod processor;
pub mod provider;
pub mod record;
pub mod scope;
pub mod simple;
pub mod systemd;
