//! Streaming reader for the runtime's `profile.txt`.

use std::collections::BTreeMap;

/// One function's observed counts from the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSection {
    pub function: String,
    pub counts: BTreeMap<u64, u64>,
}

/// Iterates over the `Function:` sections of a profile, one at a time, so the
/// decoder never holds more than one function's data.
pub struct ProfileReader<'a> {
    lines: std::str::Lines<'a>,
    pending: Option<String>,
}

impl<'a> ProfileReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            pending: None,
        }
    }
}

impl Iterator for ProfileReader<'_> {
    type Item = ProfileSection;

    fn next(&mut self) -> Option<ProfileSection> {
        let function = match self.pending.take() {
            Some(name) => name,
            None => loop {
                let line = self.lines.next()?;
                if let Some(name) = line.strip_prefix("Function: ") {
                    break name.to_string();
                }
            },
        };

        let mut counts = BTreeMap::new();
        for line in self.lines.by_ref() {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(name) = line.strip_prefix("Function: ") {
                self.pending = Some(name.to_string());
                break;
            }
            let Some((path_id, count)) = line.split_once(':') else {
                log::warn!("profile for `{function}`: skipping malformed line `{line}`");
                continue;
            };
            match (path_id.trim().parse(), count.trim().parse()) {
                (Ok(path_id), Ok(count)) => {
                    counts.insert(path_id, count);
                }
                _ => log::warn!("profile for `{function}`: skipping malformed line `{line}`"),
            }
        }
        Some(ProfileSection { function, counts })
    }
}
