use anyhow::Result;

use crate::geodesy::{self, CrossTrack, Point};
use crate::simplify::Context;

struct Node {
    index: usize,
    // every track point up to this node is within tolerance of the leg
    // ending here
    settled: bool,
}

#[derive(Default)]
struct Peaks {
    min: f64,
    min_index: usize,
    max: f64,
    max_index: usize,
}

fn find_peaks(points: &[&Point], start: usize, end: usize) -> Peaks {
    let course = geodesy::bearing(points[start], points[end]);
    let mut peaks = Peaks::default();
    for (i, point) in points.iter().enumerate().take(end).skip(start) {
        let xtk = geodesy::cross_track(
            geodesy::distance(point, points[end]),
            course,
            geodesy::bearing(point, points[end]),
        );
        if let CrossTrack::Defined(xtk) = xtk {
            if xtk < peaks.min {
                peaks.min = xtk;
                peaks.min_index = i;
            }
            if xtk > peaks.max {
                peaks.max = xtk;
                peaks.max_index = i;
            }
        }
    }
    peaks
}

// Split point for a leg that starts and ends at the same place, where there
// is no course to measure cross-track against: the point farthest away.
fn farthest(points: &[&Point], start: usize, end: usize, tolerance: f64) -> Option<usize> {
    let mut best = None;
    let mut max = tolerance;
    for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
        let distance = geodesy::distance(point, points[end]);
        if distance > max {
            max = distance;
            best = Some(i);
        }
    }
    best
}

/// Returns the chosen track indices and whether every leg ended up within
/// tolerance.
pub(super) fn run(points: &[&Point], context: &Context) -> Result<(Vec<usize>, bool)> {
    refine(points, &[0, points.len() - 1], context.tolerance, context)
}

/// Splits the legs between `indices` until no track point strays more than
/// `tolerance` meters from the leg covering it.
pub(super) fn refine(
    points: &[&Point],
    indices: &[usize],
    tolerance: f64,
    context: &Context,
) -> Result<(Vec<usize>, bool)> {
    let mut nodes: Vec<Node> = indices
        .iter()
        .map(|&index| Node {
            index,
            settled: false,
        })
        .collect();
    let mut inserted = 0;
    let mut converged = true;

    loop {
        context.check_cancelled()?;
        let mut split = false;
        // Back to front, so insertions never shift the legs still to visit.
        for i in (1..nodes.len()).rev() {
            if nodes[i].settled {
                continue;
            }
            let (start, end) = (nodes[i - 1].index, nodes[i].index);
            let mut peak_nodes = Vec::with_capacity(2);
            if points[start].same_location(points[end]) {
                peak_nodes.extend(farthest(points, start, end, tolerance));
            } else {
                let peaks = find_peaks(points, start, end);
                if peaks.min < -tolerance {
                    peak_nodes.push(peaks.min_index);
                }
                if peaks.max > tolerance {
                    peak_nodes.push(peaks.max_index);
                }
            }
            if peak_nodes.is_empty() {
                nodes[i].settled = true;
                continue;
            }
            // keep the new nodes in track order
            peak_nodes.sort_unstable_by(|a, b| b.cmp(a));
            inserted += peak_nodes.len();
            for index in peak_nodes {
                nodes.insert(
                    i,
                    Node {
                        index,
                        settled: false,
                    },
                );
            }
            split = true;
        }
        if !split {
            break;
        }
        if inserted > context.config.max_iterations {
            converged = false;
            break;
        }
    }
    debug!(
        "[simplify] peak insertion inserted {} waypoints, converged: {}",
        inserted, converged
    );
    Ok((nodes.into_iter().map(|n| n.index).collect(), converged))
}
