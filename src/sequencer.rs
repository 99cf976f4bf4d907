use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::extractor::Sprite;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SequencerSettings {
    /// Max difference between consecutive tops within one row (default: 10)
    pub row_threshold: u32,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self { row_threshold: 10 }
    }
}

/// Sprites whose tops lie close together
#[derive(Debug, Clone, Default)]
pub struct RowGroup {
    pub sprites: Vec<Sprite>,
}

/// Partition sprites into rows after a stable sort on top.
///
/// Each sprite is compared only with the one before it, so a row can drift
/// downward when tops increase gradually.
pub fn group_rows(mut sprites: Vec<Sprite>, row_threshold: u32) -> Vec<RowGroup> {
    sprites.sort_by_key(|s| s.bounds.top);

    let mut rows: Vec<RowGroup> = Vec::new();
    let mut previous_top: Option<u32> = None;

    for sprite in sprites {
        let top = sprite.bounds.top;
        let starts_row = match previous_top {
            Some(prev) => top.abs_diff(prev) > row_threshold,
            None => true,
        };

        if starts_row {
            rows.push(RowGroup::default());
        }
        if let Some(row) = rows.last_mut() {
            row.sprites.push(sprite);
        }
        previous_top = Some(top);
    }

    rows
}

/// Reading order: rows top to bottom, left to right within a row
pub fn sequence(sprites: Vec<Sprite>, row_threshold: u32) -> Vec<Sprite> {
    let mut rows = group_rows(sprites, row_threshold);
    debug!("Grouped sprites into {} rows", rows.len());

    for row in &mut rows {
        row.sprites.sort_by_key(|s| s.bounds.left);
    }

    rows.into_iter().flat_map(|row| row.sprites).collect()
}
