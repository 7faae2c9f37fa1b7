use crate::math::normalize_degrees;
use serde::Serialize;

/// Count of bearings per fixed-width compass sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BearingHistogram {
    bin_width_deg: u32,
    counts: Vec<usize>,
}

impl BearingHistogram {
    /// `bin_width_deg` is clamped to 1..=360; the last sector may be narrower.
    pub fn new(bin_width_deg: u32) -> Self {
        let width = bin_width_deg.clamp(1, 360);
        Self {
            bin_width_deg: width,
            counts: vec![0; 360_u32.div_ceil(width) as usize],
        }
    }

    pub fn from_bearings<I: IntoIterator<Item = f64>>(bearings: I, bin_width_deg: u32) -> Self {
        let mut histogram = Self::new(bin_width_deg);
        bearings.into_iter().for_each(|b| histogram.add(b));
        histogram
    }

    /// Non-finite bearings are ignored.
    pub fn add(&mut self, bearing_deg: f64) {
        if !bearing_deg.is_finite() {
            return;
        }
        let bin = (normalize_degrees(bearing_deg) / f64::from(self.bin_width_deg)) as usize;
        let last = self.counts.len() - 1;
        self.counts[bin.min(last)] += 1;
    }

    pub fn bin_width(&self) -> u32 {
        self.bin_width_deg
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Lower edge in degrees and count of the fullest sector; ties go to the lowest.
    pub fn peak(&self) -> Option<(u32, usize)> {
        let (idx, &count) = self
            .counts
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, count)| **count)?;
        (count > 0).then(|| (idx as u32 * self.bin_width_deg, count))
    }
}

impl Default for BearingHistogram {
    fn default() -> Self {
        Self::new(10)
    }
}
