//! The brightness ladder: the fixed, ordered set of valid raw levels.

use std::fmt;
use std::str::FromStr;

/// Ladder index treated as "low". Auto-dim targets this and never goes
/// below it.
pub(crate) const DIM_INDEX: usize = 1;

/// Strictly increasing raw brightness levels, first entry always 0
/// (display off). Which levels exist is configuration, not a constant:
/// different panel revisions ship different ladders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ladder {
    levels: Vec<u32>,
}

impl Ladder {
    pub fn new(levels: Vec<u32>) -> Result<Self, String> {
        if levels.len() < 2 {
            return Err("ladder needs at least two levels".to_owned());
        }
        if levels[0] != 0 {
            return Err("ladder must start at 0 (display off)".to_owned());
        }
        if !levels.windows(2).all(|w| w[0] < w[1]) {
            return Err("ladder levels must be strictly increasing".to_owned());
        }
        Ok(Self { levels })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Raw level at an index. Callers only hold indices produced by
    /// this ladder, so this never goes out of bounds.
    pub fn value(&self, index: usize) -> u32 {
        self.levels[index]
    }

    #[allow(unused)]
    pub fn top_index(&self) -> usize {
        self.levels.len() - 1
    }

    /// Default index used when turning the display back on.
    pub fn medium_index(&self) -> usize {
        self.levels.len() / 2
    }

    /// Map a raw hardware value to the nearest index whose level does
    /// not exceed it. Values above the top level clamp to the top.
    pub fn sync_index(&self, raw: u32) -> usize {
        self.levels.iter().rposition(|&lvl| lvl <= raw).unwrap_or(0)
    }
}

impl fmt::Display for Ladder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.levels.iter().map(u32::to_string).collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}

impl FromStr for Ladder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let levels = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u32>()
                    .map_err(|e| format!("bad ladder level {:?}: {e}", part.trim()))
            })
            .collect::<Result<Vec<u32>, String>>()?;
        Ladder::new(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_ladder() -> Ladder {
        "0,1,3,6".parse().unwrap()
    }

    #[test]
    fn parses_and_renders() {
        let ladder = default_ladder();
        assert_eq!(ladder.len(), 4);
        assert_eq!(ladder.value(2), 3);
        assert_eq!(ladder.to_string(), "[0, 1, 3, 6]");
    }

    #[test]
    fn rejects_bad_ladders() {
        assert!(Ladder::new(vec![0]).is_err());
        assert!(Ladder::new(vec![1, 3]).is_err());
        assert!(Ladder::new(vec![0, 3, 3]).is_err());
        assert!(Ladder::new(vec![0, 6, 3]).is_err());
        assert!("0,1,x".parse::<Ladder>().is_err());
    }

    #[test]
    fn sync_picks_nearest_not_exceeding() {
        let ladder = default_ladder();
        assert_eq!(ladder.sync_index(0), 0);
        assert_eq!(ladder.sync_index(1), 1);
        assert_eq!(ladder.sync_index(2), 1);
        assert_eq!(ladder.sync_index(5), 2);
        assert_eq!(ladder.sync_index(6), 3);
    }

    #[test]
    fn sync_clamps_above_top() {
        let ladder = default_ladder();
        assert_eq!(ladder.sync_index(7), ladder.top_index());
        assert_eq!(ladder.sync_index(255), ladder.top_index());
    }

    #[test]
    fn derived_indices() {
        let ladder = default_ladder();
        assert_eq!(ladder.medium_index(), 2);
        assert_eq!(ladder.top_index(), 3);
    }
}
