//! Monitoring-mode policy for location messages.

use crate::types::{MonitoringMode, ReportType};

/// Whether a location message for `report_type` may be emitted under `mode`.
///
/// | mode | allowed |
/// |---|---|
/// | `Quiet` | `User` |
/// | `Manual` | `User`, `Circular` |
/// | `Significant`, `Move` | all |
#[must_use]
pub const fn may_publish_location(mode: MonitoringMode, report_type: ReportType) -> bool {
    match mode {
        MonitoringMode::Quiet => matches!(report_type, ReportType::User),
        MonitoringMode::Manual => matches!(report_type, ReportType::User | ReportType::Circular),
        MonitoringMode::Significant | MonitoringMode::Move => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REPORT_TYPES: [ReportType; 4] = [
        ReportType::Default,
        ReportType::User,
        ReportType::Response,
        ReportType::Circular,
    ];

    #[test]
    fn test_quiet_allows_only_user() {
        for report_type in ALL_REPORT_TYPES {
            assert_eq!(
                may_publish_location(MonitoringMode::Quiet, report_type),
                report_type == ReportType::User,
                "{report_type}"
            );
        }
    }

    #[test]
    fn test_manual_allows_user_and_circular() {
        for report_type in ALL_REPORT_TYPES {
            let expected = matches!(report_type, ReportType::User | ReportType::Circular);
            assert_eq!(
                may_publish_location(MonitoringMode::Manual, report_type),
                expected,
                "{report_type}"
            );
        }
    }

    #[test]
    fn test_unrestricted_modes_allow_everything() {
        for mode in [MonitoringMode::Significant, MonitoringMode::Move] {
            for report_type in ALL_REPORT_TYPES {
                assert!(may_publish_location(mode, report_type), "{mode}/{report_type}");
            }
        }
    }
}
