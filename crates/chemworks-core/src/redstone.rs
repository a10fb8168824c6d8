use serde::{Deserialize, Serialize};

/// How a machine reacts to a redstone signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RedstoneControl {
    /// Ignore the signal.
    #[default]
    Disabled,
    /// Run only while powered.
    High,
    /// Run only while unpowered.
    Low,
    /// Run once on each rising edge.
    Pulse,
}

impl RedstoneControl {
    /// The next mode in the cycle a control button steps through.
    pub fn next(self) -> Self {
        match self {
            RedstoneControl::Disabled => RedstoneControl::High,
            RedstoneControl::High => RedstoneControl::Low,
            RedstoneControl::Low => RedstoneControl::Pulse,
            RedstoneControl::Pulse => RedstoneControl::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedstoneState {
    pub control: RedstoneControl,
    powered: bool,
    was_powered: bool,
}

impl RedstoneState {
    pub fn new(control: RedstoneControl) -> Self {
        Self {
            control,
            ..Self::default()
        }
    }

    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Record the current signal. Hosts may call this any number of times
    /// between ticks; only the reading at tick time counts.
    pub fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    /// Latch the current signal as the previous one. Called once at the end
    /// of every machine tick, so a held signal is a single pulse.
    pub fn advance(&mut self) {
        self.was_powered = self.powered;
    }

    /// Whether the control mode permits work given the current signal.
    pub fn can_function(&self) -> bool {
        match self.control {
            RedstoneControl::Disabled => true,
            RedstoneControl::High => self.powered,
            RedstoneControl::Low => !self.powered,
            RedstoneControl::Pulse => self.powered && !self.was_powered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_always_functions() {
        let mut rs = RedstoneState::new(RedstoneControl::Disabled);
        assert!(rs.can_function());
        rs.set_powered(true);
        assert!(rs.can_function());
    }

    #[test]
    fn high_and_low_follow_signal() {
        let mut high = RedstoneState::new(RedstoneControl::High);
        let mut low = RedstoneState::new(RedstoneControl::Low);
        assert!(!high.can_function());
        assert!(low.can_function());
        high.set_powered(true);
        low.set_powered(true);
        assert!(high.can_function());
        assert!(!low.can_function());
    }

    #[test]
    fn pulse_fires_on_rising_edge_only() {
        let mut rs = RedstoneState::new(RedstoneControl::Pulse);
        assert!(!rs.can_function());
        rs.set_powered(true);
        assert!(rs.can_function());
        rs.advance();
        assert!(!rs.can_function(), "held signal is not a new pulse");
        rs.set_powered(true);
        assert!(!rs.can_function(), "repeating the reading is not a new pulse");
        rs.set_powered(false);
        rs.advance();
        rs.set_powered(true);
        assert!(rs.can_function());
    }

    #[test]
    fn control_cycles() {
        let mut c = RedstoneControl::Disabled;
        for _ in 0..4 {
            c = c.next();
        }
        assert_eq!(c, RedstoneControl::Disabled);
    }
}
