use serde::{Deserialize, Serialize};

/// Highest number of speed upgrades a machine accepts.
pub const MAX_SPEED_UPGRADES: u8 = 8;

/// Installed upgrades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UpgradeData")]
pub struct UpgradeComponent {
    speed: u8,
}

#[derive(Serialize, Deserialize)]
struct UpgradeData {
    speed: u8,
}

impl From<UpgradeData> for UpgradeComponent {
    fn from(data: UpgradeData) -> Self {
        UpgradeComponent::new(data.speed)
    }
}

impl UpgradeComponent {
    pub fn new(speed: u8) -> Self {
        Self {
            speed: speed.min(MAX_SPEED_UPGRADES),
        }
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Install `count` more speed upgrades. Returns how many were accepted.
    pub fn add_speed(&mut self, count: u8) -> u8 {
        let accepted = count.min(MAX_SPEED_UPGRADES - self.speed);
        self.speed += accepted;
        accepted
    }

    /// Remove up to `count` speed upgrades. Returns how many were removed.
    pub fn remove_speed(&mut self, count: u8) -> u8 {
        let removed = count.min(self.speed);
        self.speed -= removed;
        removed
    }

    /// Applications allowed per tick: `2^speed`.
    pub fn speed_multiplier(&self) -> u32 {
        1u32 << self.speed
    }

    /// Human-readable summary for upgrade tooltips.
    pub fn info_lines(&self) -> Vec<String> {
        if self.speed == 0 {
            return Vec::new();
        }
        vec![
            format!("Speed upgrades: {}/{}", self.speed, MAX_SPEED_UPGRADES),
            format!("Speed: x{}", self.speed_multiplier()),
        ]
    }
}
