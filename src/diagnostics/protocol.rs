//! Diagnostics wire protocol: one request byte, a UTF-8 text reply.

use crate::observability::profiling::RuntimeStats;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping = 0x01,
    Version = 0x04,
    Stats = 0x07,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Command::Ping),
            0x04 => Ok(Command::Version),
            0x07 => Ok(Command::Stats),
            other => Err(other),
        }
    }
}

/// Reply for a raw command byte.
pub fn respond(byte: u8) -> String {
    match Command::try_from(byte) {
        Ok(Command::Ping) => "pong\n".to_string(),
        Ok(Command::Version) => format!("{} {}\n", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        Ok(Command::Stats) => RuntimeStats::collect().to_text(),
        Err(other) => format!("unknown command 0x{other:02x}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_commands() {
        assert_eq!(Command::try_from(0x01), Ok(Command::Ping));
        assert_eq!(Command::try_from(0x07), Ok(Command::Stats));
        assert_eq!(Command::try_from(0x02), Err(0x02));
    }

    #[test]
    fn replies() {
        assert_eq!(respond(0x01), "pong\n");
        assert!(respond(0x04).starts_with("exgin "));
        assert!(respond(0x07).contains("uptime_secs: "));
        assert_eq!(respond(0xff), "unknown command 0xff\n");
    }
}
