//! Local premise splitting for conditions that hand the model a ready-made list.

/// Split an argument into premises on `.` boundaries.
///
/// Segments are trimmed and empty ones (consecutive periods, trailing period)
/// are dropped before numbering.
pub fn split_premises(argument: &str) -> Vec<&str> {
    argument
        .split('.')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Render premises as a numbered, quoted list: `1. "A"\n2. "B"`.
pub fn format_premise_list(argument: &str) -> String {
    split_premises(argument)
        .iter()
        .enumerate()
        .map(|(i, premise)| format!("{}. \"{}\"", i + 1, premise))
        .collect::<Vec<_>>()
        .join("\n")
}
