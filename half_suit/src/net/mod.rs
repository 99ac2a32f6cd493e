//! Wire message types shared by the server and its clients.

pub mod messages;

pub use messages::{ClientMessage, ParseError, ServerEvent, parse_client_message};
