use serde_json::json;

use crate::error::RconError;

/// Text color used by `announce` when none is given
pub const DEFAULT_ANNOUNCE_COLOR: &str = "yellow";

/// Trim a command and drop one leading `/`; RCON takes commands without it
pub fn sanitize_command(command: &str) -> Result<String, RconError> {
    let trimmed = command.trim();
    let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed).trim_start();
    if stripped.is_empty() {
        return Err(RconError::EmptyCommand);
    }
    Ok(stripped.to_string())
}

/// `say <message>` broadcast
pub fn say_command(message: &str) -> Result<String, RconError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(RconError::EmptyCommand);
    }
    Ok(format!("say {message}"))
}

/// `tellraw @a` broadcast with a colored JSON text component
pub fn tellraw_command(message: &str, color: &str) -> Result<String, RconError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(RconError::EmptyCommand);
    }
    let color = match color.trim() {
        "" => DEFAULT_ANNOUNCE_COLOR,
        color => color,
    };
    let component = json!({ "text": message, "color": color });
    Ok(format!("tellraw @a {component}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_one_slash() {
        assert_eq!(sanitize_command("/list").unwrap(), "list");
        assert_eq!(sanitize_command("  /time set day ").unwrap(), "time set day");
        assert_eq!(sanitize_command("list").unwrap(), "list");
        assert_eq!(sanitize_command("//wand").unwrap(), "/wand");
    }

    #[test]
    fn test_empty_commands_are_rejected() {
        assert!(matches!(sanitize_command("  "), Err(RconError::EmptyCommand)));
        assert!(matches!(sanitize_command("/"), Err(RconError::EmptyCommand)));
        assert!(matches!(say_command(""), Err(RconError::EmptyCommand)));
        assert!(matches!(tellraw_command(" ", "red"), Err(RconError::EmptyCommand)));
    }

    #[test]
    fn test_say() {
        assert_eq!(say_command(" hello all ").unwrap(), "say hello all");
    }

    fn component(command: &str) -> serde_json::Value {
        let json = command.strip_prefix("tellraw @a ").unwrap();
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_tellraw_escapes_text() {
        let command = tellraw_command(r#"say "hi" \o/"#, "red").unwrap();
        assert!(command.contains(r#""say \"hi\" \\o/""#));
        assert_eq!(
            component(&command),
            json!({ "text": r#"say "hi" \o/"#, "color": "red" })
        );
    }

    #[test]
    fn test_tellraw_default_color() {
        let command = tellraw_command("restart soon", "").unwrap();
        assert_eq!(
            component(&command),
            json!({ "text": "restart soon", "color": "yellow" })
        );
    }
}
