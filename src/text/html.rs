//! Markup removal for email bodies.
//!
//! Only character data survives: tags, comments, doctype declarations and
//! processing instructions are dropped. Text inside `<script>`/`<style>` is
//! kept, like any other character data. Character references are decoded.

/// Removes markup from `input` and decodes character references.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut data_start = 0;
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('<') {
        let lt = pos + offset;
        match markup_end(input, lt) {
            Some(end) => {
                push_data(&mut out, &input[data_start..lt]);
                pos = end;
                data_start = end;
            }
            None => {
                // Not markup: keep the '<' as text.
                pos = lt + 1;
            }
        }
    }
    push_data(&mut out, &input[data_start..]);
    out
}

/// Byte offset just past the markup construct starting at `lt`, if any.
fn markup_end(input: &str, lt: usize) -> Option<usize> {
    let rest = &input[lt + 1..];

    if rest.starts_with("!--") {
        return rest[3..].find("-->").map(|i| lt + 1 + 3 + i + 3);
    }

    let first = rest.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '/' || first == '!' || first == '?') {
        return None;
    }

    let mut quote: Option<char> = None;
    for (i, ch) in rest.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '>' => return Some(lt + 1 + i + 1),
                _ => {}
            },
        }
    }
    None
}

fn push_data(out: &mut String, data: &str) {
    // Full HTML5 reference set, including legacy names without `;`.
    out.push_str(&htmlize::unescape(data));
}
