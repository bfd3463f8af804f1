//! Tiny glyph histograms.

/// Ramp from empty to full. Index 0 is reserved for buckets under 1%.
pub const GLYPHS: [char; 11] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '▒', '▓', '█'];

/// A rendered histogram and each bucket's integer share of the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyphs {
    pub text: String,
    pub percentages: Vec<u64>,
}

/// Map bucket counts onto [`GLYPHS`]: a bucket holding less than 1% of the
/// total is blank, otherwise it gets glyph `count * 9 / total + 1`.
pub fn glyph_graph(counts: &[u64]) -> Glyphs {
    let total: u64 = counts.iter().sum();
    let mut text = String::with_capacity(counts.len() * 3);
    let mut percentages = Vec::with_capacity(counts.len());
    for &count in counts {
        let percentage = if total == 0 { 0 } else { count * 100 / total };
        let index = if percentage == 0 {
            0
        } else {
            (count * (GLYPHS.len() as u64 - 2) / total + 1) as usize
        };
        text.push(GLYPHS[index.min(GLYPHS.len() - 1)]);
        percentages.push(percentage);
    }
    Glyphs { text, percentages }
}

/// Count values per bucket `0..size`, values past the end land in the last one.
pub fn linear_histogram<I>(values: I, size: usize) -> Vec<u64>
where
    I: IntoIterator<Item = usize>,
{
    let mut counts = vec![0u64; size];
    if size == 0 {
        return counts;
    }
    for value in values {
        counts[value.min(size - 1)] += 1;
    }
    counts
}

/// Equal-width bins over `[min, max]` of the values. Fewer bins are used when
/// the largest value is below `bins`, so small ranges keep one bin per value.
pub fn compressed_histogram(values: &[usize], bins: usize) -> Vec<u64> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    let bins = bins.min(max + 1).max(1);
    let (mut lo, mut hi) = (min as f64, max as f64);
    if min == max {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0u64; bins];
    for &value in values {
        let bin = ((value as f64 - lo) / width) as usize;
        counts[bin.min(bins - 1)] += 1;
    }
    counts
}
