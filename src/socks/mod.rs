//! SOCKS5 protocol core
//!
//! Wire codec, method negotiation, username/password sub-negotiation,
//! request/reply handling and the relay engine. Everything here works on any
//! `AsyncRead + AsyncWrite` stream; sockets are owned by the caller.

mod auth;
mod codec;
mod command;
mod consts;
mod handler;
mod tcp_relay;
mod types;

pub use auth::{
    authenticate, negotiate, AuthMethod, CredentialVerifier, MethodPolicy, PreferenceList,
    UserTable,
};
pub use codec::{decode_address, decode_port, decode_target, encode_address, encode_port};
pub use command::{
    read_reply, read_request, write_failure_reply, write_reply, write_success_reply, Reply,
    ReplyMode,
};
pub use consts::*;
pub use handler::{establish_target, serve_connection, ServerContext, DEFAULT_HANDSHAKE_TIMEOUT_SECS};
pub use tcp_relay::{relay, RelayOptions, RelayStats};
pub use types::{Address, Credentials, MethodSet, Request, SocksCommand, TargetAddr};
