use serde::{Deserialize, Serialize};

use crate::chart::ChartPeriod;
use crate::config::{ClockSpec, Config, GoalTargets};

/// Per-user dashboard settings. Stored values override the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// User the preferences belong to.
    pub user: String,
    /// IANA timezone the user works in.
    pub home_timezone: String,
    /// World clocks, in display order.
    pub clocks: Vec<ClockSpec>,
    /// Period the communications chart opens on.
    pub chart_period: ChartPeriod,
    /// Default goal targets.
    pub goal_targets: GoalTargets,
}

impl UserPreferences {
    /// Preferences derived from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            user: config.user.name.clone(),
            home_timezone: config.user.home_timezone.clone(),
            clocks: config.clocks.entries.clone(),
            chart_period: ChartPeriod::Week,
            goal_targets: config.goals,
        }
    }

    /// Overlay the stored settings onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        config.user.home_timezone.clone_from(&self.home_timezone);
        config.clocks.entries.clone_from(&self.clocks);
        config.goals = self.goal_targets;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = Config::default();
        let prefs = UserPreferences::from_config(&config);
        assert_eq!(prefs.user, config.user.name);
        assert_eq!(prefs.clocks, config.clocks.entries);
        assert_eq!(prefs.chart_period, ChartPeriod::Week);
    }

    #[test]
    fn test_apply_to_overrides_config() {
        let mut config = Config::default();
        let mut prefs = UserPreferences::from_config(&config);
        prefs.home_timezone = "Asia/Singapore".to_string();
        prefs.clocks.truncate(1);
        prefs.goal_targets.calls = 5;

        prefs.apply_to(&mut config);
        assert_eq!(config.user.home_timezone, "Asia/Singapore");
        assert_eq!(config.clocks.entries.len(), 1);
        assert_eq!(config.goals.calls, 5);
    }

    #[test]
    fn test_json_shape() {
        let prefs = UserPreferences::from_config(&Config::default());
        let json = serde_json::to_string(&prefs).unwrap();
        assert!(json.contains("\"chart_period\":\"week\""));
    }
}
