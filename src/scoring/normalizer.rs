use indexmap::IndexMap;

/// Filler written in place of a missing entry; a missed hole counts as a fail.
pub const DEFAULT_FILLER: &str = "7";

/// Replace empty cells with `filler` and right-pad the row up to `target_length`.
///
/// Rows longer than `target_length` are kept as they are.
pub fn normalize(cells: &[String], target_length: usize, filler: &str) -> Vec<String> {
    let mut row: Vec<String> = cells
        .iter()
        .map(|cell| {
            if cell.trim().is_empty() {
                filler.to_owned()
            } else {
                cell.clone()
            }
        })
        .collect();

    if row.len() < target_length {
        row.resize(target_length, filler.to_owned());
    }
    row
}

/// Number of holes a row is expected to cover on `current_hole`.
pub fn target_length(current_hole: u8, include_today: bool) -> usize {
    let current = usize::from(current_hole);
    if include_today {
        current
    } else {
        current.saturating_sub(1)
    }
}

/// Write today's score into a sheet row.
///
/// A row that stops right before today gets the value appended; a row that already
/// reaches today only has its cell replaced while it is still empty. Any other row
/// shape is left untouched. Returns whether the row changed.
pub fn fill_today(row: &mut Vec<String>, current_hole: u8, value: &str) -> bool {
    let today_index = usize::from(current_hole).saturating_sub(1);
    if row.len() == today_index {
        row.push(value.to_owned());
        return true;
    }
    match row.get_mut(today_index) {
        Some(cell) if cell.is_empty() && !value.is_empty() => {
            *cell = value.to_owned();
            true
        }
        _ => false,
    }
}

/// Normalizes sheet rows for one round on one day.
#[derive(Debug, Clone)]
pub struct ScoreNormalizer {
    filler: String,
    current_hole: Option<u8>,
}

impl ScoreNormalizer {
    /// `current_hole` is `None` off-season, which turns normalization into a passthrough.
    pub fn new(filler: impl Into<String>, current_hole: Option<u8>) -> Self {
        Self {
            filler: filler.into(),
            current_hole,
        }
    }

    /// Value written for missing entries.
    pub fn filler(&self) -> &str {
        &self.filler
    }

    /// Expected row length, `None` when rows pass through.
    pub fn target_length(&self, include_today: bool) -> Option<usize> {
        self.current_hole
            .map(|hole| target_length(hole, include_today))
    }

    /// Normalize one player's row.
    pub fn normalize(&self, cells: &[String], include_today: bool) -> Vec<String> {
        match self.target_length(include_today) {
            Some(length) => normalize(cells, length, &self.filler),
            None => cells.to_vec(),
        }
    }

    /// Pair the sheet's name column with its score rows.
    ///
    /// Names without a score row get an all-filler row, blank names are dropped and the
    /// sheet order is preserved.
    pub fn normalize_sheet(
        &self,
        names: &[String],
        rows: &[Vec<String>],
        include_today: bool,
    ) -> IndexMap<String, Vec<String>> {
        names
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let cells = rows.get(index).map(Vec::as_slice).unwrap_or_default();
                Some((name.to_owned(), self.normalize(cells, include_today)))
            })
            .collect()
    }
}
