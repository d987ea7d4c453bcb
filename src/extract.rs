const FENCE: &str = "```";

enum ScanState {
    Default,
    InString,
    InEscape,
}

pub fn first_json_object(text: &str) -> Option<&str> {
    scan_object(strip_fences(text))
}

fn strip_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix(FENCE) {
        // drop the info string ("json", "JSON", …) up to the end of the fence line
        body = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
        if let Some(idx) = body.rfind(FENCE) {
            body = &body[..idx];
        }
        body = body.trim();
    }
    body
}

// Depth counting has to skip over string contents: the script or prompt
// fields routinely contain braces, so a naive brace count would cut early.
fn scan_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut state = ScanState::Default;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match state {
            ScanState::Default => match byte {
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(&text[start..start + offset + 1]);
                    }
                }
                b'"' => state = ScanState::InString,
                _ => {}
            },
            ScanState::InString => match byte {
                b'\\' => state = ScanState::InEscape,
                b'"' => state = ScanState::Default,
                _ => {}
            },
            ScanState::InEscape => state = ScanState::InString,
        }
    }
    None
}
