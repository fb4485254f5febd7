use crate::parser::Position;
use log::debug;
use std::collections::HashMap;

/// Breakpoint ghci acknowledged, with the number it assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub number: i32,
    pub position: Position,
}

/// Breakpoints by the (module, line) they were requested at.
#[derive(Debug, Default)]
pub struct Breakpoints {
    points: HashMap<(String, u32), Breakpoint>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module: &str, line: u32, breakpoint: Breakpoint) {
        debug!(
            "breakpoint {} set at {module}:{line} ({})",
            breakpoint.number, breakpoint.position
        );
        self.points.insert((module.to_string(), line), breakpoint);
    }

    pub fn remove(&mut self, module: &str, line: u32) -> Option<Breakpoint> {
        let removed = self.points.remove(&(module.to_string(), line));
        if let Some(bp) = &removed {
            debug!("breakpoint {} removed from {module}:{line}", bp.number);
        }
        removed
    }

    pub fn get(&self, module: &str, line: u32) -> Option<&Breakpoint> {
        self.points.get(&(module.to_string(), line))
    }

    /// Breakpoints ordered by ghci number.
    pub fn list(&self) -> Vec<&Breakpoint> {
        let mut list: Vec<_> = self.points.values().collect();
        list.sort_by_key(|bp| bp.number);
        list
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bp(number: i32, line: i32) -> Breakpoint {
        Breakpoint {
            number,
            position: Position::new("A.hs", line, 1, line, 10),
        }
    }

    #[test]
    fn test_add_remove() {
        let mut points = Breakpoints::new();
        points.add("Main", 7, bp(1, 7));
        points.add("Main", 3, bp(0, 3));
        assert_eq!(points.len(), 2);
        assert_eq!(points.get("Main", 3), Some(&bp(0, 3)));
        assert_eq!(
            points.list().iter().map(|bp| bp.number).collect::<Vec<_>>(),
            vec![0, 1]
        );

        assert_eq!(points.remove("Main", 3), Some(bp(0, 3)));
        assert_eq!(points.remove("Main", 3), None);
        points.clear();
        assert!(points.is_empty());
    }
}
