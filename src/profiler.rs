use std::fmt;
use std::time::{Duration, Instant};

/// Render a duration as "HH:MM:SS"
pub fn format_hms(t: Duration) -> String {
    let total = t.as_secs();
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

fn format_rate(count: u64, secs: f64, unit: &str) -> String {
    if count == 0 || secs <= 0.0 {
        return format!("0 {}", unit);
    }
    let rate = count as f64 / secs;
    if rate >= 1e9 {
        format!("{:.3} G{}", rate / 1e9, unit)
    } else if rate >= 1e6 {
        format!("{:.3} M{}", rate / 1e6, unit)
    } else if rate >= 1e3 {
        format!("{:.3} K{}", rate / 1e3, unit)
    } else {
        format!("{:.0} {}", rate, unit)
    }
}

/// One labeled region of the profile tree.
///
/// Repeated visits to the same label under the same parent accumulate into
/// one node.
#[derive(Debug)]
struct ProfileNode {
    label: String,
    elapsed: Duration,
    flops: u64,
    bytes: u64,
    children: Vec<usize>,
}
impl ProfileNode {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            elapsed: Duration::ZERO,
            flops: 0,
            bytes: 0,
            children: Vec::new(),
        }
    }
}

/// Hierarchical timing profiler with flop and memory-traffic counters.
///
/// `push` opens a labeled region nested under the currently open one, `pop`
/// closes it. Components take an `Option<Rc<RefCell<Profiler>>>` and skip
/// all of this when it is `None`.
pub struct Profiler {
    name: String,
    start: Instant,
    // Node 0 is the root; children link by index into this arena.
    nodes: Vec<ProfileNode>,
    stack: Vec<(usize, Instant)>,
}
impl Profiler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
            nodes: vec![ProfileNode::new(name)],
            stack: Vec::new(),
        }
    }

    /// Open a region nested under the currently open region
    pub fn push(&mut self, label: &str) {
        let parent = match self.stack.last() {
            Some(&(idx, _)) => idx,
            None => 0,
        };
        let found = self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].label == label);
        let idx = match found {
            Some(idx) => idx,
            None => {
                self.nodes.push(ProfileNode::new(label));
                let idx = self.nodes.len() - 1;
                self.nodes[parent].children.push(idx);
                idx
            }
        };
        self.stack.push((idx, Instant::now()));
    }

    /// Close the innermost open region
    pub fn pop(&mut self) {
        self.pop_with(0, 0);
    }

    /// Close the innermost open region, crediting it with work done
    pub fn pop_with(&mut self, flops: u64, bytes: u64) {
        let (idx, begun) = self
            .stack
            .pop()
            .expect("Profiler popped with no region open");
        let node = &mut self.nodes[idx];
        node.elapsed += begun.elapsed();
        node.flops += flops;
        node.bytes += bytes;
    }

    /// Total wall time since the profiler was created
    pub fn total_elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn total_flops(&self, idx: usize) -> u64 {
        self.nodes[idx].flops
            + self.nodes[idx]
                .children
                .iter()
                .map(|&c| self.total_flops(c))
                .sum::<u64>()
    }
    fn total_bytes(&self, idx: usize) -> u64 {
        self.nodes[idx].bytes
            + self.nodes[idx]
                .children
                .iter()
                .map(|&c| self.total_bytes(c))
                .sum::<u64>()
    }
    fn child_elapsed(&self, idx: usize) -> Duration {
        self.nodes[idx]
            .children
            .iter()
            .map(|&c| self.nodes[c].elapsed)
            .sum()
    }

    fn fmt_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        idx: usize,
        depth: usize,
        total: Duration,
    ) -> fmt::Result {
        let node = &self.nodes[idx];
        let secs = node.elapsed.as_secs_f64();
        let percent = if total > Duration::ZERO {
            100.0 * secs / total.as_secs_f64()
        } else {
            0.0
        };
        writeln!(
            f,
            "{:indent$}{}: {:.4}s | {:.1}% | {} {}",
            "",
            node.label,
            secs,
            percent,
            format_rate(self.total_flops(idx), secs, "FLOPS"),
            format_rate(self.total_bytes(idx), secs, "B/s"),
            indent = 2 * depth,
        )?;
        for &c in &node.children {
            self.fmt_node(f, c, depth + 1, total)?;
        }
        if !node.children.is_empty() {
            // timer jitter can put the child sum past the parent
            let own = node.elapsed.saturating_sub(self.child_elapsed(idx));
            let own_secs = own.as_secs_f64();
            let own_percent = if total > Duration::ZERO {
                100.0 * own_secs / total.as_secs_f64()
            } else {
                0.0
            };
            writeln!(
                f,
                "{:indent$}Self: {:.4}s | {:.1}% | {} {}",
                "",
                own_secs,
                own_percent,
                format_rate(node.flops, own_secs, "FLOPS"),
                format_rate(node.bytes, own_secs, "B/s"),
                indent = 2 * (depth + 1),
            )?;
        }
        Ok(())
    }
}
impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_elapsed();
        writeln!(f, "{}: {}", self.name, format_hms(total))?;
        for &c in &self.nodes[0].children {
            self.fmt_node(f, c, 1, total)?;
        }
        Ok(())
    }
}
