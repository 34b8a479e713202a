//! "All off": one power-off command per device, strictly in order.

use log::{info, warn};

use crate::client::ApplianceApi;
use crate::directory::SelectedDevice;
use crate::dispatcher::{set_parameters, ParameterUpdate};
use crate::snapshot::StatusSnapshot;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub total: usize,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }

    pub fn message(&self) -> String {
        if self.is_complete() {
            "All devices turned off".to_string()
        } else {
            format!("{}/{} devices turned off", self.succeeded, self.total)
        }
    }
}

/// Failures are logged and skipped; only confirmed devices are patched off.
pub fn all_off<A: ApplianceApi + ?Sized>(
    api: &A,
    token: &str,
    devices: &[SelectedDevice],
    snapshot: &mut StatusSnapshot,
) -> BulkReport {
    let mut succeeded = 0;
    for device in devices {
        match set_parameters(api, token, &device.id, &ParameterUpdate::power_off()) {
            Ok(_) => {
                snapshot.patch_power(&device.id, false);
                succeeded += 1;
            }
            Err(e) => warn!("All off: failed to turn off {} ({}): {}", device.name, device.id, e),
        }
    }

    let report = BulkReport {
        succeeded,
        total: devices.len(),
    };
    info!("All off: {}/{} succeeded", report.succeeded, report.total);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{fixture, FakeApi};
    use crate::client::RemoClientError;
    use crate::models::remo::{AirconSettings, ApplianceId};
    use crate::snapshot::DeviceStatus;

    fn devices(n: usize) -> Vec<SelectedDevice> {
        (1..=n)
            .map(|i| SelectedDevice {
                id: ApplianceId(format!("ac-{}", i)),
                name: format!("Room {}", i),
            })
            .collect()
    }

    fn all_on(devs: &[SelectedDevice]) -> StatusSnapshot {
        let mut snap = StatusSnapshot::default();
        for d in devs {
            snap.patch_power(&d.id, true);
        }
        snap
    }

    fn failure() -> Result<AirconSettings, RemoClientError> {
        Err(RemoClientError::RequestFailed {
            status: 500,
            message: "boom".into(),
        })
    }

    #[test]
    fn middle_failure_is_skipped_and_left_untouched() {
        let devs = devices(3);
        let mut snap = all_on(&devs);
        let api = FakeApi::new();
        api.push_command(Ok(AirconSettings::default()));
        api.push_command(failure());
        api.push_command(Ok(AirconSettings::default()));

        let report = all_off(&api, "tok", &devs, &mut snap);
        assert_eq!(report, BulkReport { succeeded: 2, total: 3 });
        assert!(!report.is_complete());
        assert_eq!(report.message(), "2/3 devices turned off");

        let order: Vec<_> = api.set_calls().into_iter().map(|(id, _)| id.0).collect();
        assert_eq!(order, vec!["ac-1", "ac-2", "ac-3"]);
        assert!(!snap.get(&devs[0].id).unwrap().is_on);
        assert!(snap.get(&devs[1].id).unwrap().is_on);
        assert!(!snap.get(&devs[2].id).unwrap().is_on);
    }

    #[test]
    fn counts_match_for_every_failure_pattern() {
        let n = 4;
        for mask in 0u32..(1 << n) {
            let devs = devices(n);
            let mut snap = all_on(&devs);
            let api = FakeApi::new();
            for i in 0..n {
                if mask & (1 << i) != 0 {
                    api.push_command(failure());
                } else {
                    api.push_command(Ok(AirconSettings::default()));
                }
            }
            let k = mask.count_ones() as usize;

            let report = all_off(&api, "tok", &devs, &mut snap);
            assert_eq!(api.set_calls().len(), n);
            assert_eq!(report, BulkReport { succeeded: n - k, total: n });
            let patched = devs.iter().filter(|d| !snap.get(&d.id).unwrap().is_on).count();
            assert_eq!(patched, n - k);
        }
    }

    #[test]
    fn every_call_is_a_bare_power_off() {
        let devs = devices(2);
        let api = FakeApi::new();
        let report = all_off(&api, "tok", &devs, &mut StatusSnapshot::default());
        assert!(report.is_complete());
        assert_eq!(report.message(), "All devices turned off");
        for (_, fields) in api.set_calls() {
            assert_eq!(fields, vec![("button".to_string(), "power-off".to_string())]);
        }
    }

    #[test]
    fn total_failure_is_still_a_partial_report() {
        let devs = devices(2);
        let api = FakeApi::new();
        api.push_command(failure());
        api.push_command(Err(RemoClientError::Unauthorized));
        let report = all_off(&api, "tok", &devs, &mut StatusSnapshot::default());
        assert_eq!(report.message(), "0/2 devices turned off");
    }

    #[test]
    fn failed_device_keeps_its_mode_and_temperature() {
        let sel = vec![SelectedDevice {
            id: ApplianceId("ac-living-0001".into()),
            name: "Living".into(),
        }];
        let mut snap = StatusSnapshot::from_appliances(&fixture(), &sel);
        let before: DeviceStatus = snap.get(&sel[0].id).unwrap().clone();
        let api = FakeApi::new();
        api.push_command(failure());
        all_off(&api, "tok", &sel, &mut snap);
        assert_eq!(snap.get(&sel[0].id), Some(&before));
    }
}
