/// Which side a position sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before inserted content.
    Left,
    /// Move past inserted content.
    Right,
}

/// Result of mapping a position through a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The content on the associated side of the position was removed.
    pub deleted: bool,
}

/// Position mapping for a single step: a list of
/// `(start, old_size, new_size)` ranges in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
    inverted: bool,
}

impl StepMap {
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> Self {
        Self {
            ranges,
            inverted: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[(usize, usize, usize)] {
        &self.ranges
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for &(raw_start, a, b) in &self.ranges {
            let start = if self.inverted {
                (raw_start as isize - diff) as usize
            } else {
                raw_start
            };
            if start > pos {
                break;
            }
            let (old_size, new_size) = if self.inverted { (b, a) } else { (a, b) };
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Left
                } else if pos == end {
                    Assoc::Right
                } else {
                    assoc
                };
                let offset = match side {
                    Assoc::Left => 0,
                    Assoc::Right => new_size as isize,
                };
                let deleted = match assoc {
                    Assoc::Left => pos != start,
                    Assoc::Right => pos != end,
                };
                return MapResult {
                    pos: (start as isize + diff + offset) as usize,
                    deleted,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }

    /// The map that undoes this one.
    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }
}

/// A composed pipeline of step maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        Self { maps }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn append_mapping(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().cloned());
    }

    /// Maps from `start` onwards only.
    pub fn slice(&self, start: usize) -> Mapping {
        Mapping {
            maps: self.maps.get(start..).map(<[_]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |p, m| m.map(p, assoc))
    }

    /// Maps through every step; `deleted` is set if any step deleted the
    /// position.
    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut deleted = false;
        let mut pos = pos;
        for m in &self.maps {
            let r = m.map_result(pos, assoc);
            deleted |= r.deleted;
            pos = r.pos;
        }
        MapResult { pos, deleted }
    }

    /// The mapping that undoes this one.
    pub fn invert(&self) -> Mapping {
        Mapping {
            maps: self.maps.iter().rev().map(StepMap::invert).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, Assoc::Left, 0)]
    #[case(2, Assoc::Left, 2)]
    #[case(2, Assoc::Right, 5)]
    #[case(3, Assoc::Right, 6)]
    #[case(10, Assoc::Left, 13)]
    fn insertion_shifts_following_positions(
        #[case] pos: usize,
        #[case] assoc: Assoc,
        #[case] expected: usize,
    ) {
        let map = StepMap::new(vec![(2, 0, 3)]);
        assert_eq!(map.map(pos, assoc), expected);
    }

    #[test]
    fn deletion_reports_deleted_positions() {
        let map = StepMap::new(vec![(2, 4, 0)]);
        assert_eq!(map.map_result(4, Assoc::Right), MapResult { pos: 2, deleted: true });
        assert_eq!(map.map_result(2, Assoc::Left), MapResult { pos: 2, deleted: false });
        assert_eq!(map.map_result(6, Assoc::Right), MapResult { pos: 2, deleted: false });
        assert_eq!(map.map(8, Assoc::Left), 4);
    }

    #[test]
    fn inverted_map_restores_positions() {
        let map = StepMap::new(vec![(2, 1, 4), (10, 2, 0)]);
        let inverse = map.invert();
        for pos in [0, 1, 12, 15] {
            let forward = map.map(pos, Assoc::Right);
            assert_eq!(inverse.map(forward, Assoc::Right), pos, "pos {pos}");
        }
    }

    #[test]
    fn mapping_composes_in_order() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(0, 0, 2)]));
        mapping.append_map(StepMap::new(vec![(5, 3, 0)]));
        // 4 -> 6 -> 5 (inside the deleted range, pushed to its start)
        assert_eq!(mapping.map_result(4, Assoc::Left), MapResult { pos: 5, deleted: true });
        assert_eq!(mapping.map(10, Assoc::Left), 9);
        assert_eq!(mapping.slice(1).map(10, Assoc::Left), 7);
        assert_eq!(mapping.invert().map(9, Assoc::Left), 10);
    }
}
