//! Repair of truncated markup in model output

const DIV_OPEN: &str = "<div";
const DIV_CLOSE: &str = "</div>";

/// Drop a dangling tag fragment and close unbalanced `<div>` elements
///
/// A `<` after the last `>` starts an unterminated tag and everything from it
/// on is removed. Closing tags are then appended until the `<div` count no
/// longer exceeds the `</div>` count.
pub fn sanitize(text: &str) -> String {
    let tail_start = text.rfind('>').map_or(0, |i| i + 1);
    let mut out = match text[tail_start..].find('<') {
        Some(offset) => text[..tail_start + offset].to_string(),
        None => text.to_string(),
    };

    let opened = out.matches(DIV_OPEN).count();
    let closed = out.matches(DIV_CLOSE).count();
    for _ in closed..opened {
        out.push_str(DIV_CLOSE);
    }
    out
}
