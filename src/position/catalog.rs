use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PositionSettings;

/// Positions served when no custom catalog is configured.
pub const YOGA_POSITIONS: [&str; 10] = [
    "Mountain Pose (Tadasana)",
    "Downward-Facing Dog (Adho Mukha Svanasana)",
    "Warrior I (Virabhadrasana I)",
    "Warrior II (Virabhadrasana II)",
    "Tree Pose (Vrksasana)",
    "Child's Pose (Balasana)",
    "Cobra Pose (Bhujangasana)",
    "Bridge Pose (Setu Bandha Sarvangasana)",
    "Triangle Pose (Trikonasana)",
    "Corpse Pose (Savasana)",
];

pub const DEFAULT_HOLD_INSTRUCTIONS: &str =
    "as you're holding this pose, breathe in and out slowly and deeply";

#[derive(Clone, Debug)]
pub struct PositionCatalog {
    positions: Vec<String>,
    instructions: String,
}

impl Default for PositionCatalog {
    fn default() -> Self {
        Self {
            positions: YOGA_POSITIONS.iter().map(|p| p.to_string()).collect(),
            instructions: DEFAULT_HOLD_INSTRUCTIONS.to_string(),
        }
    }
}

impl PositionCatalog {
    pub fn new(positions: Vec<String>, instructions: String) -> anyhow::Result<Self> {
        if positions.is_empty() {
            return Err(anyhow::anyhow!("position catalog must not be empty"));
        }
        Ok(Self {
            positions,
            instructions,
        })
    }

    /// Catalog from configuration; unset fields fall back to the built-in values.
    pub fn from_settings(settings: &PositionSettings) -> anyhow::Result<Self> {
        let defaults = Self::default();
        Self::new(
            settings
                .positions
                .clone()
                .unwrap_or(defaults.positions),
            settings
                .instructions
                .clone()
                .unwrap_or(defaults.instructions),
        )
    }

    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    pub fn contains(&self, position: &str) -> bool {
        self.positions.iter().any(|p| p == position)
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // Non-empty by construction.
        self.positions
            .choose(rng)
            .map(String::as_str)
            .unwrap_or(YOGA_POSITIONS[0])
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}
