//! Hierarchical wall-clock timer tree.
//!
//! A `TimerNode` is a plain value type threaded explicitly through the
//! solve call and the driver — never global mutable state, per the
//! redesign notes. It serializes to a small whitespace-delimited grammar
//! (pre-order `depth name elapsed_seconds` triples) so a serial run's
//! timings can be persisted to disk and a later parallel run can load them
//! back to compute speedup/efficiency.

use crate::error::{JacobiError, Result};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct TimerNode {
    name: String,
    elapsed: Duration,
    running_since: Option<Instant>,
    children: Vec<TimerNode>,
}

impl TimerNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elapsed: Duration::ZERO,
            running_since: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn children(&self) -> &[TimerNode] {
        &self.children
    }

    /// Start (or resume) accumulating wall-clock time on this node.
    pub fn start(&mut self) {
        self.running_since = Some(Instant::now());
    }

    /// Stop accumulating; adds the delta since the matching `start()` to
    /// this node's accumulator. A no-op if the node was not running.
    pub fn stop(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.elapsed += since.elapsed();
        }
    }

    /// Add an already-measured duration directly to this node's
    /// accumulator (used by the sweep engine to fold in worker-local
    /// phase timings after a round's barrier).
    pub fn add_duration(&mut self, duration: Duration) {
        self.elapsed += duration;
    }

    /// Get the child with the given name, creating it (appended) if absent.
    pub fn child_mut(&mut self, name: &str) -> &mut TimerNode {
        if let Some(idx) = self.children.iter().position(|c| c.name == name) {
            return &mut self.children[idx];
        }
        self.children.push(TimerNode::new(name));
        self.children.last_mut().unwrap()
    }

    /// Depth-first search for a node by name (this node included).
    pub fn find(&self, name: &str) -> Option<&TimerNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Serialize as pre-order `depth name elapsed_seconds` triples, one
    /// per line, `elapsed_seconds` formatted with full `f64` precision.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.serialize_into(0, &mut out);
        out
    }

    fn serialize_into(&self, depth: usize, out: &mut String) {
        out.push_str(&format!("{} {} {:.9}\n", depth, self.name, self.elapsed_secs()));
        for child in &self.children {
            child.serialize_into(depth + 1, out);
        }
    }

    /// Parse a tree previously produced by `serialize`.
    pub fn parse(text: &str) -> Result<TimerNode> {
        let mut stack: Vec<TimerNode> = Vec::new();
        let mut root: Option<TimerNode> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, ' ');
            let depth: usize = parts
                .next()
                .ok_or_else(|| JacobiError::TimerParseError(format!("missing depth in line: {line}")))?
                .parse()
                .map_err(|_| JacobiError::TimerParseError(format!("bad depth in line: {line}")))?;
            let name = parts
                .next()
                .ok_or_else(|| JacobiError::TimerParseError(format!("missing name in line: {line}")))?
                .to_string();
            let secs: f64 = parts
                .next()
                .ok_or_else(|| JacobiError::TimerParseError(format!("missing elapsed in line: {line}")))?
                .parse()
                .map_err(|_| JacobiError::TimerParseError(format!("bad elapsed in line: {line}")))?;

            let mut node = TimerNode::new(name);
            node.elapsed = Duration::from_secs_f64(secs.max(0.0));

            if depth == 0 {
                if root.is_some() {
                    return Err(JacobiError::TimerParseError(
                        "more than one root node in timer serialization".to_string(),
                    ));
                }
                stack.push(node);
                continue;
            }

            // Pop back to the node at depth - 1, which is this node's parent.
            while stack.len() > depth {
                let finished = stack.pop().unwrap();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(finished);
                } else {
                    root = Some(finished);
                }
            }
            if stack.len() != depth {
                return Err(JacobiError::TimerParseError(format!(
                    "depth {} has no parent at depth {}",
                    depth,
                    depth - 1
                )));
            }
            node.running_since = None;
            stack.push(node);
        }

        while let Some(finished) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(finished);
            } else {
                root = Some(finished);
            }
        }

        root.ok_or_else(|| JacobiError::TimerParseError("empty timer serialization".to_string()))
    }

    /// A human-readable, indented report, matching the hierarchical style
    /// of the underlying tree (used for the CLI's timing summary).
    pub fn report(&self) -> String {
        let mut out = String::new();
        self.report_into(0, &mut out);
        out
    }

    fn report_into(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{indent}{}: {:.6}s\n", self.name, self.elapsed_secs()));
        for child in &self.children {
            child.report_into(depth + 1, out);
        }
    }
}

/// One row of a speedup/efficiency report: `(name, speedup, efficiency)`.
/// `efficiency` is `speedup / worker_count`, expressed as a fraction
/// (multiply by 100 for a percentage).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedupRow<'a> {
    pub name: &'a str,
    pub speedup: f64,
    pub efficiency: f64,
}

/// Zip `parallel` against `baseline` by node name, computing
/// `speedup = baseline.elapsed / parallel.elapsed` for every name present
/// in both trees. Names present only in one tree are silently skipped —
/// the caller is expected to log a diagnostic, not treat it as fatal.
pub fn speedup_report<'a>(parallel: &'a TimerNode, baseline: &TimerNode, worker_count: usize) -> Vec<SpeedupRow<'a>> {
    let mut rows = Vec::new();
    collect_speedup(parallel, baseline, worker_count, &mut rows);
    rows
}

fn collect_speedup<'a>(node: &'a TimerNode, baseline: &TimerNode, worker_count: usize, rows: &mut Vec<SpeedupRow<'a>>) {
    if let Some(base_node) = baseline.find(&node.name) {
        let parallel_secs = node.elapsed_secs();
        if parallel_secs > 0.0 {
            let speedup = base_node.elapsed_secs() / parallel_secs;
            let efficiency = speedup / worker_count.max(1) as f64;
            rows.push(SpeedupRow {
                name: &node.name,
                speedup,
                efficiency,
            });
        }
    }
    for child in &node.children {
        collect_speedup(child, baseline, worker_count, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_tree() -> TimerNode {
        let mut root = TimerNode::new("run");
        root.add_duration(Duration::from_secs_f64(1.5));
        root.child_mut("pre-multiplication").add_duration(Duration::from_secs_f64(0.6));
        root.child_mut("post-multiplication").add_duration(Duration::from_secs_f64(0.4));
        root
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let root = sample_tree();
        let text = root.serialize();
        let parsed = TimerNode::parse(&text).unwrap();

        assert_eq!(parsed.name(), "run");
        assert!((parsed.elapsed_secs() - root.elapsed_secs()).abs() < 1e-9);
        assert_eq!(parsed.children().len(), 2);
        assert!((parsed.find("pre-multiplication").unwrap().elapsed_secs() - 0.6).abs() < 1e-9);
        assert!((parsed.find("post-multiplication").unwrap().elapsed_secs() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn speedup_zips_by_name() {
        let mut serial = TimerNode::new("run");
        serial.add_duration(Duration::from_secs_f64(4.0));
        serial.child_mut("pre-multiplication").add_duration(Duration::from_secs_f64(2.0));

        let mut parallel = TimerNode::new("run");
        parallel.add_duration(Duration::from_secs_f64(1.0));
        parallel.child_mut("pre-multiplication").add_duration(Duration::from_secs_f64(0.5));

        let rows = speedup_report(&parallel, &serial, 4);
        let run_row = rows.iter().find(|r| r.name == "run").unwrap();
        assert!((run_row.speedup - 4.0).abs() < 1e-9);
        assert!((run_row.efficiency - 1.0).abs() < 1e-9);

        let pre_row = rows.iter().find(|r| r.name == "pre-multiplication").unwrap();
        assert!((pre_row.speedup - 4.0).abs() < 1e-9);
    }

    #[test]
    fn missing_names_are_skipped_not_fatal() {
        let serial = TimerNode::new("run");
        let mut parallel = TimerNode::new("run");
        parallel.child_mut("only-in-parallel").add_duration(Duration::from_secs_f64(1.0));

        let rows = speedup_report(&parallel, &serial, 2);
        assert!(rows.iter().all(|r| r.name != "only-in-parallel"));
    }
}
