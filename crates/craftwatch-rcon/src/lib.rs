//! RCON client for craftwatch
//!
//! Speaks the Source RCON protocol used by Minecraft servers, and knows how
//! to turn the `list` reply into a [`PlayerList`].

mod client;
mod command;
mod error;
mod list;
mod packet;

pub use client::{DEFAULT_RCON_PORT, RconClient, RconConfig};
pub use command::{DEFAULT_ANNOUNCE_COLOR, sanitize_command, say_command, tellraw_command};
pub use error::RconError;
pub use list::{parse_list_response, strip_color_codes};
pub use packet::{MAX_COMMAND_BYTES, Packet, PacketKind};

// Re-export types used in our public API
pub use craftwatch_types::PlayerList;
