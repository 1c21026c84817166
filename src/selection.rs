//! Typed results for interactive choices
//!
//! Prompts loop on [`Selection::Invalid`] instead of re-entering the whole
//! operation, and stop on [`Selection::Cancelled`].

/// Outcome of interpreting one line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Ok(T),
    Invalid,
    Cancelled,
}

impl<T> Selection<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Selection::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Selection<U> {
        match self {
            Selection::Ok(value) => Selection::Ok(f(value)),
            Selection::Invalid => Selection::Invalid,
            Selection::Cancelled => Selection::Cancelled,
        }
    }
}

fn is_cancel(input: &str) -> bool {
    input.is_empty() || input.eq_ignore_ascii_case("q")
}

/// Pick an item by its 1-based position in `items`.
pub fn select_by_index<T>(items: &[T], input: &str) -> Selection<usize> {
    let input = input.trim();
    if is_cancel(input) {
        return Selection::Cancelled;
    }
    match input.parse::<usize>() {
        Ok(n) if n >= 1 && n <= items.len() => Selection::Ok(n - 1),
        _ => Selection::Invalid,
    }
}

/// Pick one name by 1-based index or by case-insensitive prefix.
///
/// An exact (case-insensitive) name wins over prefix matches; a prefix that
/// matches several names is invalid. Empty input or `q` cancels.
pub fn select_name<S: AsRef<str>>(names: &[S], input: &str) -> Selection<usize> {
    let input = input.trim();
    if is_cancel(input) {
        return Selection::Cancelled;
    }

    if let Selection::Ok(index) = select_by_index(names, input) {
        return Selection::Ok(index);
    }

    if let Some(index) = names
        .iter()
        .position(|n| n.as_ref().eq_ignore_ascii_case(input))
    {
        return Selection::Ok(index);
    }

    let needle = input.to_lowercase();
    let mut matches = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.as_ref().to_lowercase().starts_with(&needle));

    match (matches.next(), matches.next()) {
        (Some((index, _)), None) => Selection::Ok(index),
        _ => Selection::Invalid,
    }
}

/// Interpret a yes/no answer; an empty answer means yes.
pub fn parse_confirm(input: &str) -> bool {
    matches!(input.trim(), "" | "y" | "Y" | "yes" | "Yes" | "YES")
}
