//! Test-vector verification.
//!
//! Runs the reference evaluator over the vectors carried in a netlist
//! archive. A sample matches when the network's outputs start with the
//! expected bits (the network may be wider than the dataset). With a
//! category layout, the winning category of the outputs is compared with
//! the winning category of the expected vector as well.

use anyhow::Result;
use gateforge_hdl::CategoryLayout;
use gateforge_netlist::{Network, TestVectors};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub samples: usize,
    pub exact_matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_matches: Option<usize>,
    /// First sample whose outputs disagreed with the expected bits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_mismatch: Option<usize>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.exact_matches == self.samples
    }

    pub fn category_accuracy(&self) -> Option<f64> {
        let matches = self.category_matches?;
        (self.samples > 0).then(|| matches as f64 / self.samples as f64)
    }
}

/// Set bits per category, reading `outputs` the way the emitted
/// `categories` port does.
pub fn category_scores(outputs: &[bool], layout: &CategoryLayout) -> Vec<usize> {
    let (stride, take) = if layout.strided {
        let stride = layout.stride(outputs.len());
        (stride, stride.min(layout.bits_per_category))
    } else {
        (layout.bits_per_category, layout.bits_per_category)
    };
    (0..layout.count)
        .map(|category| {
            let lo = (category * stride).min(outputs.len());
            let hi = (lo + take).min(outputs.len());
            outputs[lo..hi].iter().filter(|bit| **bit).count()
        })
        .collect()
}

/// Index of the highest score; later categories win ties.
pub fn winning_category(scores: &[usize]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .max_by_key(|(_, score)| **score)
        .map(|(index, _)| index)
}

/// Expected vectors are split into `count` equal contiguous slices.
fn expected_category(expected: &[bool], count: usize) -> Option<usize> {
    let chunk = expected.len() / count.max(1);
    if chunk == 0 {
        return None;
    }
    let scores: Vec<usize> = expected
        .chunks(chunk)
        .take(count)
        .map(|slice| slice.iter().filter(|bit| **bit).count())
        .collect();
    winning_category(&scores)
}

pub fn verify_test_vectors(
    network: &Network,
    vectors: &TestVectors,
    categories: Option<&CategoryLayout>,
) -> Result<VerificationReport> {
    let mut report = VerificationReport {
        samples: 0,
        exact_matches: 0,
        category_matches: categories.map(|_| 0),
        first_mismatch: None,
    };

    for (index, (inputs, expected)) in vectors.samples().enumerate() {
        let outputs = network.evaluate(&inputs)?;
        report.samples += 1;
        if outputs.starts_with(&expected) {
            report.exact_matches += 1;
        } else if report.first_mismatch.is_none() {
            debug!(sample = index, "outputs disagree with expected bits");
            report.first_mismatch = Some(index);
        }

        if let (Some(layout), Some(matches)) = (categories, report.category_matches.as_mut()) {
            let computed = winning_category(&category_scores(&outputs, layout));
            if computed.is_some() && computed == expected_category(&expected, layout.count) {
                *matches += 1;
            }
        }
    }

    info!(
        samples = report.samples,
        exact_matches = report.exact_matches,
        category_matches = ?report.category_matches,
        "verified test vectors"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateforge_netlist::{Gate, GateOp, Layer};
    use ndarray::array;

    /// out = [a & b, a | b, a ^ b, ~a]
    fn network() -> Network {
        Network::new(
            2,
            vec![Layer::new(vec![
                Gate::new(GateOp::And, 0, 1),
                Gate::new(GateOp::Or, 0, 1),
                Gate::new(GateOp::Xor, 0, 1),
                Gate::new(GateOp::NotA, 0, 1),
            ])],
        )
        .unwrap()
    }

    #[test]
    fn test_ties_go_to_highest_category() {
        assert_eq!(winning_category(&[1, 3, 3, 0]), Some(2));
        assert_eq!(winning_category(&[0, 0]), Some(1));
        assert_eq!(winning_category(&[]), None);
    }

    #[test]
    fn test_category_scores_follow_layout() {
        let bits = [true, true, false, true, false, false, true, true];
        assert_eq!(category_scores(&bits, &CategoryLayout::new(2, 4)), vec![3, 2]);
        // stride 4, only the first two bits of each slice count
        assert_eq!(
            category_scores(&bits, &CategoryLayout::new(2, 2).strided(true)),
            vec![2, 0]
        );
        // outputs narrower than the port read as zero
        assert_eq!(category_scores(&bits[..5], &CategoryLayout::new(2, 4)), vec![3, 0]);
    }

    #[test]
    fn test_prefix_matches() {
        let vectors = TestVectors::new(
            array![[0u8, 0], [1, 1], [1, 0]],
            array![[0u8, 0, 0], [1, 1, 0], [1, 1, 0]],
        )
        .unwrap();
        let report = verify_test_vectors(&network(), &vectors, None).unwrap();
        assert_eq!(report.samples, 3);
        // [1,0] -> [0,1,1,0]: expected [1,1,0] disagrees on the first bit
        assert_eq!(report.exact_matches, 2);
        assert_eq!(report.first_mismatch, Some(2));
        assert!(!report.passed());
        assert_eq!(report.category_matches, None);
    }

    #[test]
    fn test_category_agreement() {
        let vectors = TestVectors::new(array![[1u8, 1], [0, 0]], array![[1u8, 1, 0, 0], [0, 0, 1, 1]])
            .unwrap();
        let layout = CategoryLayout::new(2, 2);
        let report = verify_test_vectors(&network(), &vectors, Some(&layout)).unwrap();
        assert_eq!(report.samples, 2);
        assert_eq!(report.exact_matches, 1);
        assert_eq!(report.category_matches, Some(2));
        assert_eq!(report.category_accuracy(), Some(1.0));
    }

    #[test]
    fn test_wrong_input_width_fails() {
        let vectors = TestVectors::new(array![[1u8, 1, 1]], array![[1u8]]).unwrap();
        assert!(verify_test_vectors(&network(), &vectors, None).is_err());
    }
}
