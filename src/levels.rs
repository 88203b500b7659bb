use crate::level::{Level, LevelError, UndoQuota};
use std::fs;
use std::path::Path;

/// A collection of levels in XSB format.
#[derive(Debug)]
pub struct Levels {
    levels: Vec<Level>,
}

impl Levels {
    /// Parse XSB-formatted levels from a string.
    ///
    /// The XSB format uses:
    /// - Lines starting with `;` as level separators/comments
    /// - Level characters as accepted by [`Level::from_text`]
    /// - Empty lines between levels (optional)
    ///
    /// A comment of the form `; undo: N` or `; undo: unlimited` sets the undo
    /// policy of the next level. Levels without one get `Unlimited`.
    pub fn from_text(contents: &str) -> Result<Self, LevelError> {
        let mut levels = Vec::new();
        let mut current_level = String::new();
        let mut pending_undo: Option<UndoQuota> = None;

        let mut finish = |current_level: &mut String, pending_undo: &mut Option<UndoQuota>| {
            // Remove trailing newline but preserve internal structure
            let level_str = current_level.trim_end();
            let undo = pending_undo.take().unwrap_or_default();
            let level = Level::from_text(level_str, undo)?;
            tracing::debug!(
                index = levels.len(),
                width = level.width(),
                height = level.height(),
                %undo,
                "parsed level"
            );
            levels.push(level);
            current_level.clear();
            Ok::<(), LevelError>(())
        };

        for line in contents.lines() {
            if let Some(comment) = line.trim_start().strip_prefix(';') {
                // If we have accumulated a level, parse and save it
                if !current_level.is_empty() {
                    finish(&mut current_level, &mut pending_undo)?;
                }
                if let Some(undo) = parse_undo_directive(comment)? {
                    pending_undo = Some(undo);
                }
                continue;
            }

            if line.trim().is_empty() {
                if !current_level.is_empty() {
                    // Empty line within a level - end of level
                    finish(&mut current_level, &mut pending_undo)?;
                }
                continue;
            }

            current_level.push_str(line);
            current_level.push('\n');
        }

        // Don't forget the last level if file doesn't end with empty line
        if !current_level.is_empty() {
            finish(&mut current_level, &mut pending_undo)?;
        }

        Ok(Levels { levels })
    }

    /// Parse XSB-formatted levels from a text file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents)
    }

    /// Get the nth level (0-indexed).
    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }
}

fn parse_undo_directive(comment: &str) -> Result<Option<UndoQuota>, LevelError> {
    let Some((key, value)) = comment.split_once(':') else {
        return Ok(None);
    };
    if !key.trim().eq_ignore_ascii_case("undo") {
        return Ok(None);
    }
    value
        .parse::<UndoQuota>()
        .map(Some)
        .map_err(LevelError::InvalidDirective)
}
