/// Upper-case the first character of every word and lower-case the rest.
///
/// A word starts at an alphanumeric character (or `_`) and runs up to the next
/// whitespace, so `"light rain"` becomes `"Light Rain"` and `"(heavy)"` becomes
/// `"(Heavy)"`. Whitespace and any punctuation in front of a word are copied
/// through untouched.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            in_word = false;
            out.push(ch);
        } else if in_word {
            out.extend(ch.to_lowercase());
        } else if is_word_start(ch) {
            in_word = true;
            push_upper(&mut out, ch);
        } else {
            out.push(ch);
        }
    }

    out
}

fn is_word_start(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

// Multi-char upper-case expansions ('ß' -> "SS") would not survive a second
// pass, so those characters are left as they are.
fn push_upper(out: &mut String, ch: char) {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => out.push(single),
        _ => out.push(ch),
    }
}
