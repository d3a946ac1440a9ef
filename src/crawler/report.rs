//! Structured outcome of one crawl

use std::fmt;

/// Level of the select hierarchy a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLevel {
    Manufacturer,
    Device,
    Action,
}

impl fmt::Display for NodeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Manufacturer => "manufacturer",
            Self::Device => "device",
            Self::Action => "action",
        };
        f.write_str(name)
    }
}

/// A node skipped after its retries were exhausted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub level: NodeLevel,

    /// Display names from the manufacturer down to the failed node
    pub path: Vec<String>,

    pub error: String,
}

impl NodeFailure {
    pub fn path_display(&self) -> String {
        self.path.join(" > ")
    }
}

/// Counters and failures collected during one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub manufacturers_visited: usize,
    pub devices_visited: usize,
    pub actions_visited: usize,

    /// Price rows written, including rows without a value
    pub prices_recorded: usize,

    /// Price rows written without a value
    pub prices_missing: usize,

    /// Price rows that could not be written
    pub price_write_failures: usize,

    pub failures: Vec<NodeFailure>,
}

impl CrawlReport {
    /// Failures recorded at one level
    pub fn failures_at(&self, level: NodeLevel) -> impl Iterator<Item = &NodeFailure> {
        self.failures.iter().filter(move |f| f.level == level)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.price_write_failures == 0
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} manufacturers, {} devices, {} actions visited; {} prices recorded ({} without value); {} nodes skipped",
            self.manufacturers_visited,
            self.devices_visited,
            self.actions_visited,
            self.prices_recorded,
            self.prices_missing,
            self.failures.len()
        )?;
        if self.price_write_failures > 0 {
            write!(f, "; {} price writes failed", self.price_write_failures)?;
        }
        Ok(())
    }
}
