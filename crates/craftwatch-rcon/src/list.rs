use std::sync::LazyLock;

use regex::Regex;

use craftwatch_types::PlayerList;

use crate::error::RconError;

static COLOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)§[0-9a-fk-or]").expect("color code pattern compiles"));

static GROUP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:]+:\s*").expect("group prefix pattern compiles"));

/// Header formats seen from vanilla and localized servers, tried in order
static HEADERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"There are (?P<count>\d+) of a max(?:imum)? of (?P<max>\d+) players online:?(?P<rest>.*)",
        r"There are (?P<count>\d+) out of maximum (?P<max>\d+) players online\.?(?P<rest>.*)",
        r"(?P<count>\d+) 人のプレイヤーが接続中です。最大接続可能人数: ?(?P<max>\d+)(?P<rest>.*)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("list header pattern compiles"))
    .collect()
});

/// Remove `§x` formatting codes
pub fn strip_color_codes(text: &str) -> String {
    COLOR_CODE.replace_all(text, "").into_owned()
}

/// Parse the reply to `list`.
///
/// Names may follow the header on the same line or sit on later lines,
/// optionally prefixed with a permission group (`default: Alice, Bob`).
pub fn parse_list_response(raw: &str) -> Result<PlayerList, RconError> {
    let clean = strip_color_codes(raw);
    let mut lines = clean.lines().map(str::trim).filter(|line| !line.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| RconError::UnparseableList("empty response".to_string()))?;

    let caps = HEADERS
        .iter()
        .find_map(|re| re.captures(header))
        .ok_or_else(|| RconError::UnparseableList(header.to_string()))?;

    let number = |name: &str| -> Result<u32, RconError> {
        caps[name]
            .parse()
            .map_err(|_| RconError::UnparseableList(header.to_string()))
    };
    let player_count = number("count")?;
    let max_players = number("max")?;

    let rest = caps
        .name("rest")
        .map(|m| m.as_str().trim_start_matches(':').trim())
        .unwrap_or_default();

    let mut players = split_names(rest);
    for line in lines {
        players.extend(split_names(&GROUP_PREFIX.replace(line, "")));
    }

    Ok(PlayerList {
        player_count,
        max_players,
        players,
    })
}

fn split_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(|name| GROUP_PREFIX.replace(name.trim(), "").trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_single_line() {
        let raw = "There are 2 of a max of 20 players online: Alice, Bob";
        let list = parse_list_response(raw).unwrap();
        assert_eq!(
            list,
            PlayerList {
                player_count: 2,
                max_players: 20,
                players: vec!["Alice".to_string(), "Bob".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_server() {
        let list = parse_list_response("There are 0 of a max of 20 players online: ").unwrap();
        assert_eq!(list.player_count, 0);
        assert!(list.players.is_empty());
    }

    #[test]
    fn test_multi_line_with_groups_and_colors() {
        let raw = "§6There are §c2§6 out of maximum §c20§6 players online.\n§6default§r: Alice\nadmins: Bob\n";
        let list = parse_list_response(raw).unwrap();
        assert_eq!(list.player_count, 2);
        assert_eq!(list.max_players, 20);
        assert_eq!(list.players, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_japanese_format() {
        let raw = "2 人のプレイヤーが接続中です。最大接続可能人数: 10\ndefault: fnetnon, Alice";
        let list = parse_list_response(raw).unwrap();
        assert_eq!(list.player_count, 2);
        assert_eq!(list.max_players, 10);
        assert_eq!(list.players, vec!["fnetnon", "Alice"]);
    }

    #[test]
    fn test_unparseable() {
        assert!(matches!(
            parse_list_response(""),
            Err(RconError::UnparseableList(_))
        ));
        assert!(matches!(
            parse_list_response("Unknown command"),
            Err(RconError::UnparseableList(_))
        ));
    }

    #[test]
    fn test_strip_color_codes() {
        assert_eq!(strip_color_codes("§aGreen§R text§k"), "Green text");
    }
}
