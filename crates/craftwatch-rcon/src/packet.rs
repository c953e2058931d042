use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::RconError;

/// Largest command body a vanilla server accepts
pub const MAX_COMMAND_BYTES: usize = 1446;

/// Largest response body a vanilla server sends in one packet
const MAX_RESPONSE_BYTES: usize = 4096;

/// id + type + two NUL terminators
const HEADER_AND_TERMINATORS: usize = 10;

/// Packet type field.
///
/// The protocol reuses `2` for both an outgoing command and the auth reply,
/// so the raw value is kept and interpreted by direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketKind(pub i32);

impl PacketKind {
    pub const RESPONSE_VALUE: Self = Self(0);
    pub const EXEC_COMMAND: Self = Self(2);
    pub const AUTH_RESPONSE: Self = Self(2);
    pub const AUTH: Self = Self(3);
}

/// One RCON frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: PacketKind,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: PacketKind, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Little-endian `length, id, type, body, NUL, NUL`
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let length = (body.len() + HEADER_AND_TERMINATORS) as i32;

        let mut out = Vec::with_capacity(4 + length as usize);
        out.extend_from_slice(&length.to_le_bytes());
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.kind.0.to_le_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(&[0, 0]);
        out
    }

    /// Read one frame
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, RconError>
    where
        R: AsyncRead + Unpin,
    {
        let length = reader.read_i32_le().await?;
        let valid = HEADER_AND_TERMINATORS..=MAX_RESPONSE_BYTES + HEADER_AND_TERMINATORS;
        let length = usize::try_from(length)
            .ok()
            .filter(|len| valid.contains(len))
            .ok_or_else(|| RconError::Protocol(format!("invalid packet length {length}")))?;

        let mut frame = vec![0u8; length];
        reader.read_exact(&mut frame).await?;

        if frame[length - 2..] != [0, 0] {
            return Err(RconError::Protocol("packet is not NUL terminated".to_string()));
        }

        let id = i32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let kind = i32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
        let body = String::from_utf8_lossy(&frame[8..length - 2]).into_owned();

        Ok(Self {
            id,
            kind: PacketKind(kind),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let bytes = Packet::new(7, PacketKind::EXEC_COMMAND, "list").encode();
        assert_eq!(
            bytes,
            vec![
                14, 0, 0, 0, // length
                7, 0, 0, 0, // id
                2, 0, 0, 0, // type
                b'l', b'i', b's', b't', 0, 0,
            ]
        );
    }

    #[tokio::test]
    async fn test_read_frame() {
        let bytes = Packet::new(-1, PacketKind::AUTH_RESPONSE, "").encode();
        let packet = Packet::read_from(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(packet.id, -1);
        assert_eq!(packet.kind, PacketKind::AUTH_RESPONSE);
        assert_eq!(packet.body, "");
    }

    #[tokio::test]
    async fn test_rejects_bad_frames() {
        let mut short: &[u8] = &[4, 0, 0, 0, 1, 0, 0, 0];
        assert!(matches!(
            Packet::read_from(&mut short).await,
            Err(RconError::Protocol(_))
        ));

        let mut unterminated = Packet::new(1, PacketKind::RESPONSE_VALUE, "hi").encode();
        let last = unterminated.len() - 1;
        unterminated[last] = b'!';
        assert!(matches!(
            Packet::read_from(&mut unterminated.as_slice()).await,
            Err(RconError::Protocol(_))
        ));

        let mut truncated: &[u8] = &[20, 0, 0, 0, 1, 0];
        assert!(matches!(
            Packet::read_from(&mut truncated).await,
            Err(RconError::Io(_))
        ));
    }
}
