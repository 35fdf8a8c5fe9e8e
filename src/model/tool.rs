//! Canvas tool modes.

use serde::{Deserialize, Serialize};

/// What a plain click on the canvas does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolMode {
    /// Create and refine masks.
    #[default]
    CreateMask,
    /// Delete the mask under the pointer.
    EraseMask,
}

impl ToolMode {
    pub fn name(&self) -> &'static str {
        match self {
            ToolMode::CreateMask => "Create mask",
            ToolMode::EraseMask => "Erase mask",
        }
    }

    pub fn all() -> &'static [ToolMode] {
        &[ToolMode::CreateMask, ToolMode::EraseMask]
    }

    /// The next tool in cycling order.
    pub fn next(self) -> Self {
        match self {
            ToolMode::CreateMask => ToolMode::EraseMask,
            ToolMode::EraseMask => ToolMode::CreateMask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        let mut tool = ToolMode::default();
        for _ in 0..ToolMode::all().len() {
            tool = tool.next();
        }
        assert_eq!(tool, ToolMode::CreateMask);
    }
}
