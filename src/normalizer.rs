//! フラグメントテキストの整形。
//!
//! 空白と改行をすべて取り除いたあと、値そのものに空白を含みうる
//! フォント名と URL だけは元テキストの値に戻す。

/// 空白を元に戻すフィールド
pub const RESTORED_KEYS: [&str; 2] = ["fontFamilyName", "url"];

// タブは値の一部になりうるので残す
fn is_stripped(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\r')
}

pub fn normalize(text: &str) -> String {
    let mut condensed: String = text.chars().filter(|&c| !is_stripped(c)).collect();

    // 切り出し時に残った区切り文字
    while condensed.ends_with(',') {
        condensed.pop();
    }

    for key in RESTORED_KEYS {
        for value in quoted_values(text, key) {
            let stripped: String = value.chars().filter(|&c| !is_stripped(c)).collect();
            if stripped == value {
                continue;
            }
            let from = format!("\"{}\":\"{}\"", key, stripped);
            let to = format!("\"{}\":\"{}\"", key, value);
            condensed = condensed.replace(&from, &to);
        }
    }

    condensed
}

/// `"key" : "value"` の value を出現順にすべて返す（エスケープ未解釈）
fn quoted_values<'t>(text: &'t str, key: &str) -> Vec<&'t str> {
    let anchor = format!("\"{}\"", key);
    let mut values = Vec::new();
    let mut rest = text;

    while let Some(pos) = rest.find(&anchor) {
        rest = &rest[pos + anchor.len()..];

        let Some(after_colon) = rest.trim_start().strip_prefix(':') else {
            continue;
        };
        let Some(body) = after_colon.trim_start().strip_prefix('"') else {
            continue;
        };
        match closing_quote(body) {
            Some(end) => {
                values.push(&body[..end]);
                rest = &body[end + 1..];
            }
            None => break,
        }
    }

    values
}

fn closing_quote(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}
