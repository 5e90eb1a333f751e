//! Runtime-tunable parameter registry.
//!
//! A tiny stand-in for an on-screen tweak panel: named scalar values with a
//! range, readable and writable while the loop runs. The app registers its
//! knobs at startup and reads them back each frame.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tunable {
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Default)]
pub struct DebugPanel {
    tunables: BTreeMap<String, Tunable>,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, value: f32, min: f32, max: f32) {
        self.tunables.insert(
            name.to_owned(),
            Tunable {
                value: value.clamp(min, max),
                min,
                max,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.tunables.get(name).map(|t| t.value)
    }

    /// Set a tunable, clamped to its registered range. Unknown names are
    /// ignored.
    pub fn set(&mut self, name: &str, value: f32) {
        if let Some(tunable) = self.tunables.get_mut(name) {
            tunable.value = value.clamp(tunable.min, tunable.max);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tunable)> {
        self.tunables.iter().map(|(name, t)| (name.as_str(), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_to_the_registered_range() {
        let mut panel = DebugPanel::new();
        panel.register("displacement_scale", 0.1, 0.0, 1.0);
        panel.set("displacement_scale", 2.5);
        assert_eq!(panel.get("displacement_scale"), Some(1.0));
        panel.set("displacement_scale", -1.0);
        assert_eq!(panel.get("displacement_scale"), Some(0.0));
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut panel = DebugPanel::new();
        panel.set("nope", 1.0);
        assert_eq!(panel.get("nope"), None);
    }
}
