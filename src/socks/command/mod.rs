//! SOCKS5 command parsing module
//!
//! Handles parsing SOCKS5 commands and building replies.

mod parser;
mod reply;

pub use parser::read_request;
pub use reply::{
    read_reply, write_failure_reply, write_reply, write_success_reply, Reply, ReplyMode,
};
