//! Level-of-detail selection and decimated caches.

use bitchart_core::Bar;

/// One decimation level. Level 0 is the identity (full resolution).
#[derive(Debug)]
pub struct LodLevel {
    pub id: usize,
    /// Visible-bar count at which this level engages.
    pub min_visible_count: usize,
    /// Power-of-two decimation factor.
    pub factor: usize,
    cache: Option<Vec<Bar>>,
}

/// Picks a decimation level for the current visible count and caches each
/// level's decimated payload.
///
/// Selection takes the largest level whose threshold the visible count
/// reaches, with a hysteresis band (default 10 % of the visible count)
/// against oscillation: switching up requires the count to clear the
/// candidate threshold by the band, switching down requires it to undercut
/// the active threshold by the band.
#[derive(Debug)]
pub struct LodManager {
    levels: Vec<LodLevel>,
    active: usize,
    hysteresis: f64,
}

impl LodManager {
    /// Build levels with factors 1, 2, 4, ... keyed by the given visible
    /// count thresholds. The first threshold should be 0 (identity level).
    pub fn new(thresholds: &[usize], hysteresis: f64) -> Self {
        let levels = thresholds
            .iter()
            .enumerate()
            .map(|(id, &min_visible_count)| LodLevel {
                id,
                min_visible_count,
                factor: 1 << id,
                cache: None,
            })
            .collect();
        Self {
            levels,
            active: 0,
            hysteresis: hysteresis.max(0.0),
        }
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn active_level(&self) -> &LodLevel {
        &self.levels[self.active]
    }

    /// Select the level for `visible_count`, applying hysteresis around the
    /// current level. Returns the active level id.
    pub fn select(&mut self, visible_count: usize) -> usize {
        let candidate = self
            .levels
            .iter()
            .rev()
            .find(|level| level.min_visible_count <= visible_count)
            .map(|level| level.id)
            .unwrap_or(0);

        if candidate == self.active {
            return self.active;
        }

        let band = (self.hysteresis * visible_count as f64) as usize;
        if candidate > self.active {
            if visible_count >= self.levels[candidate].min_visible_count + band {
                self.active = candidate;
            }
        } else if visible_count + band <= self.levels[self.active].min_visible_count {
            self.active = candidate;
        }
        self.active
    }

    /// Cached decimated payload for a level, if built and current.
    pub fn cache(&self, id: usize) -> Option<&[Bar]> {
        self.levels.get(id).and_then(|l| l.cache.as_deref())
    }

    pub fn set_cache(&mut self, id: usize, bars: Vec<Bar>) {
        if let Some(level) = self.levels.get_mut(id) {
            level.cache = Some(bars);
        }
    }

    /// Drop every cache (source data changed).
    pub fn invalidate(&mut self) {
        for level in &mut self.levels {
            level.cache = None;
        }
    }

    /// Output size for a source of `source_count` bars at a level's factor.
    pub fn target_count(source_count: usize, factor: usize) -> usize {
        (source_count / factor.max(1)).max(1)
    }
}

impl Default for LodManager {
    fn default() -> Self {
        Self::new(&[0, 4_000, 8_000, 16_000, 32_000, 64_000], 0.10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> LodManager {
        LodManager::new(&[0, 1_000, 2_000, 4_000], 0.10)
    }

    #[test]
    fn test_factors_are_powers_of_two() {
        let lod = LodManager::default();
        let factors: Vec<usize> = lod.levels().iter().map(|l| l.factor).collect();
        assert_eq!(factors, vec![1, 2, 4, 8, 16, 32]);
    }

    #[test]
    fn test_select_by_threshold() {
        let mut lod = manager();
        assert_eq!(lod.select(100), 0);
        // Far beyond the level-2 threshold with room for the band.
        assert_eq!(lod.select(3_000), 2);
        assert_eq!(lod.select(50_000), 3);
    }

    #[test]
    fn test_hysteresis_blocks_marginal_up_switch() {
        let mut lod = manager();
        // 1,050 visible: candidate is level 1 (threshold 1,000) but the
        // band is 105, so 1,050 < 1,000 + 105 keeps level 0.
        assert_eq!(lod.select(1_050), 0);
        // Clearing the band switches.
        assert_eq!(lod.select(1_200), 1);
    }

    #[test]
    fn test_hysteresis_blocks_marginal_down_switch() {
        let mut lod = manager();
        assert_eq!(lod.select(1_500), 1);
        // 950 visible: candidate is level 0, but 950 + 95 >= 1,000 keeps
        // level 1.
        assert_eq!(lod.select(950), 1);
        // Well under the band switches down.
        assert_eq!(lod.select(800), 0);
    }

    #[test]
    fn test_no_oscillation_around_threshold() {
        let mut lod = manager();
        lod.select(1_500);
        let level = lod.active_level().id;
        // Wiggling a few percent around the threshold never flips levels.
        for count in [990usize, 1_010, 995, 1_005, 1_020, 980] {
            assert_eq!(lod.select(count), level);
        }
    }

    #[test]
    fn test_cache_lifecycle() {
        let mut lod = manager();
        assert!(lod.cache(1).is_none());

        let bars = vec![Bar::new(0.0, 1.0, 2.0, 0.5, 1.5, 1.0)];
        lod.set_cache(1, bars.clone());
        assert_eq!(lod.cache(1).unwrap(), bars.as_slice());

        lod.invalidate();
        assert!(lod.cache(1).is_none());
    }

    #[test]
    fn test_target_count() {
        assert_eq!(LodManager::target_count(1000, 4), 250);
        assert_eq!(LodManager::target_count(3, 8), 1);
        assert_eq!(LodManager::target_count(100, 1), 100);
    }
}
