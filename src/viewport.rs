use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser window size a snapshot was captured at, in CSS pixels.
///
/// Comparisons across different viewports are refused unless explicitly
/// allowed, so this is part of every snapshot's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    /// A zero-sized viewport makes a snapshot invalid.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_and_emptiness() {
        let phone = Viewport {
            width: 390,
            height: 844,
        };
        assert_eq!(phone.area(), 329_160.0);
        assert!(!phone.is_empty());
        assert!(Viewport {
            width: 0,
            height: 844
        }
        .is_empty());
    }

    #[test]
    fn displays_as_width_by_height() {
        assert_eq!(Viewport::default().to_string(), "1280x720");
    }
}
