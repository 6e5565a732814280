use super::channel::{self, ChannelError, LocationPick, Stamp, SurfaceMessage};
use crate::state::ZoneVariant;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerSlot {
    Pending,
    MyLocation,
}

impl MarkerSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerSlot::Pending => "pending",
            MarkerSlot::MyLocation => "my_location",
        }
    }
}

/// Host-side mirror of a marker drawn on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerHandle {
    pub slot: MarkerSlot,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerOp {
    Remove(MarkerHandle),
    Add(MarkerHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied(Vec<MarkerOp>),
    Stale { seq: u64, latest: u64 },
    PermissionDenied,
}

/// Pending pick, spinner flag and marker handles for one map session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    pub variant: ZoneVariant,
    pick: Option<LocationPick>,
    loading: bool,
    /// Tap ordering only means something within one load of the page, so
    /// neither field survives a snapshot.
    #[serde(skip)]
    page: Option<String>,
    #[serde(skip)]
    latest_seq: Option<u64>,
    pending_marker: Option<MarkerHandle>,
    my_location: Option<LocationPick>,
    my_location_marker: Option<MarkerHandle>,
}

impl SelectionState {
    pub const fn new(variant: ZoneVariant) -> Self {
        Self {
            variant,
            pick: None,
            loading: false,
            page: None,
            latest_seq: None,
            pending_marker: None,
            my_location: None,
            my_location_marker: None,
        }
    }

    pub fn pick(&self) -> Option<&LocationPick> {
        self.pick.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn my_location(&self) -> Option<&LocationPick> {
        self.my_location.as_ref()
    }

    pub fn pending_marker(&self) -> Option<&MarkerHandle> {
        self.pending_marker.as_ref()
    }

    pub fn my_location_marker(&self) -> Option<&MarkerHandle> {
        self.my_location_marker.as_ref()
    }

    pub fn phase(&self) -> Phase {
        match (&self.pick, self.loading) {
            (Some(_), _) => Phase::Ready,
            (None, true) => Phase::Resolving,
            (None, false) => Phase::Idle,
        }
    }

    /// "Mark" depends on the pick alone; the loading flag only drives the spinner.
    pub fn mark_enabled(&self) -> bool {
        self.pick.is_some()
    }

    /// Decode and apply one raw channel payload. On error nothing changes.
    pub fn apply_raw(&mut self, raw: &str) -> Result<ApplyOutcome, ChannelError> {
        let message = channel::decode(raw)?;
        Ok(self.apply(message))
    }

    pub fn apply(&mut self, message: SurfaceMessage) -> ApplyOutcome {
        match message {
            SurfaceMessage::LoadingNotice { loading, stamp } => {
                if let Some(stale) = self.check_seq(stamp) {
                    return stale;
                }
                self.loading = loading;
                ApplyOutcome::Applied(Vec::new())
            }
            SurfaceMessage::LocationResolved {
                pick,
                loading,
                stamp,
            } => {
                if let Some(stale) = self.check_seq(stamp) {
                    return stale;
                }
                if let Some(loading) = loading {
                    self.loading = loading;
                }
                let handle = MarkerHandle {
                    slot: MarkerSlot::Pending,
                    latitude: pick.latitude,
                    longitude: pick.longitude,
                };
                debug!(lat = pick.latitude, lng = pick.longitude, name = %pick.name, "pick resolved");
                self.pick = Some(pick);
                ApplyOutcome::Applied(self.replace_pending_marker(handle))
            }
            SurfaceMessage::MyLocation { pick, loading } => {
                if let Some(loading) = loading {
                    self.loading = loading;
                }
                let mut ops = Vec::new();
                // Created once per session and never replaced.
                if self.my_location_marker.is_none() {
                    let handle = MarkerHandle {
                        slot: MarkerSlot::MyLocation,
                        latitude: pick.latitude,
                        longitude: pick.longitude,
                    };
                    self.my_location_marker = Some(handle);
                    ops.push(MarkerOp::Add(handle));
                }
                self.my_location = Some(pick);
                ApplyOutcome::Applied(ops)
            }
            SurfaceMessage::PermissionDenied => {
                info!("device location permission denied");
                ApplyOutcome::PermissionDenied
            }
        }
    }

    /// Remove-then-add on the single pending slot.
    fn replace_pending_marker(&mut self, handle: MarkerHandle) -> Vec<MarkerOp> {
        let mut ops = Vec::with_capacity(2);
        if let Some(previous) = self.pending_marker.take() {
            ops.push(MarkerOp::Remove(previous));
        }
        self.pending_marker = Some(handle);
        ops.push(MarkerOp::Add(handle));
        ops
    }

    fn check_seq(&mut self, stamp: Stamp) -> Option<ApplyOutcome> {
        if stamp.page.is_some() && stamp.page != self.page {
            debug!(page = ?stamp.page, "map page reloaded; restarting tap order");
            self.page = stamp.page;
            self.latest_seq = None;
        }
        let seq = stamp.seq?;
        match self.latest_seq {
            Some(latest) if seq < latest => {
                debug!(seq, latest, "dropping stale channel message");
                Some(ApplyOutcome::Stale { seq, latest })
            }
            _ => {
                self.latest_seq = Some(seq);
                None
            }
        }
    }

    /// Forget the tap ordering of the previous page. Called whenever the
    /// host may have loaded a fresh page, whose counter starts over.
    pub fn restart_sequence(&mut self) {
        self.page = None;
        self.latest_seq = None;
    }

    /// Discard the pick and release the pending marker handle, if any.
    pub fn clear_pick(&mut self) -> Option<MarkerHandle> {
        self.pick = None;
        self.loading = false;
        self.pending_marker.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(lat: f64, lng: f64, name: &str, seq: Option<u64>) -> SurfaceMessage {
        SurfaceMessage::LocationResolved {
            pick: LocationPick::new(lat, lng, name),
            loading: Some(false),
            stamp: Stamp::new(None, seq),
        }
    }

    fn loading(flag: bool, seq: Option<u64>) -> SurfaceMessage {
        SurfaceMessage::LoadingNotice {
            loading: flag,
            stamp: Stamp::new(None, seq),
        }
    }

    #[test]
    fn starts_idle_with_mark_disabled() {
        let sel = SelectionState::new(ZoneVariant::Safe);
        assert_eq!(sel.phase(), Phase::Idle);
        assert!(!sel.mark_enabled());
    }

    #[test]
    fn tap_then_resolution_reaches_ready() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(loading(true, None));
        assert_eq!(sel.phase(), Phase::Resolving);
        assert!(!sel.mark_enabled());

        sel.apply(resolved(-25.9, 32.6, "X", None));
        assert_eq!(sel.phase(), Phase::Ready);
        assert_eq!(sel.pick(), Some(&LocationPick::new(-25.9, 32.6, "X")));
        assert!(!sel.is_loading());
    }

    #[test]
    fn loading_notice_leaves_pick_untouched() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(resolved(1.0, 2.0, "Foo", None));
        sel.apply(loading(true, None));
        assert_eq!(sel.pick(), Some(&LocationPick::new(1.0, 2.0, "Foo")));
        assert!(sel.is_loading());
        // Ready regardless of the flag.
        assert_eq!(sel.phase(), Phase::Ready);
        assert!(sel.mark_enabled());
    }

    #[test]
    fn mark_enablement_tracks_pick_not_flag() {
        for flag in [true, false] {
            let mut sel = SelectionState::new(ZoneVariant::Danger);
            sel.apply(loading(flag, None));
            assert!(!sel.mark_enabled());
            sel.apply(resolved(0.0, 0.0, "Z", None));
            sel.apply(loading(flag, None));
            assert!(sel.mark_enabled());
        }
    }

    #[test]
    fn last_resolution_wins_for_taps_in_order() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        for i in 0..5 {
            sel.apply(loading(true, None));
            sel.apply(resolved(i as f64, i as f64, &format!("P{i}"), None));
        }
        assert_eq!(sel.pick().map(|p| p.name.as_str()), Some("P4"));
        assert_eq!(sel.pending_marker().map(|m| m.latitude), Some(4.0));
    }

    #[test]
    fn unsequenced_out_of_order_response_overwrites_newer_pick() {
        // Without seq numbers the older response wins if it lands last.
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(loading(true, None));
        sel.apply(loading(true, None));
        sel.apply(resolved(2.0, 2.0, "second", None));
        sel.apply(resolved(1.0, 1.0, "first", None));
        assert_eq!(sel.pick().map(|p| p.name.as_str()), Some("first"));
    }

    #[test]
    fn sequenced_stale_response_is_dropped() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(loading(true, Some(1)));
        sel.apply(loading(true, Some(2)));
        sel.apply(resolved(2.0, 2.0, "second", Some(2)));
        let outcome = sel.apply(resolved(1.0, 1.0, "first", Some(1)));
        assert_eq!(outcome, ApplyOutcome::Stale { seq: 1, latest: 2 });
        assert_eq!(sel.pick().map(|p| p.name.as_str()), Some("second"));
    }

    #[test]
    fn sequenced_stale_loading_does_not_restart_spinner() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(loading(true, Some(3)));
        sel.apply(resolved(3.0, 3.0, "three", Some(3)));
        sel.apply(loading(true, Some(2)));
        assert!(!sel.is_loading());
    }

    #[test]
    fn new_page_restarts_the_tap_order() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        for seq in 1..=5 {
            sel.apply(SurfaceMessage::LoadingNotice {
                loading: true,
                stamp: Stamp::new(Some("old"), Some(seq)),
            });
        }
        sel.apply(SurfaceMessage::LocationResolved {
            pick: LocationPick::new(5.0, 5.0, "P5"),
            loading: Some(false),
            stamp: Stamp::new(Some("old"), Some(5)),
        });

        let outcome = sel.apply(SurfaceMessage::LocationResolved {
            pick: LocationPick::new(1.0, 1.0, "fresh"),
            loading: Some(false),
            stamp: Stamp::new(Some("new"), Some(1)),
        });
        assert!(matches!(outcome, ApplyOutcome::Applied(_)));
        assert_eq!(sel.pick().map(|p| p.name.as_str()), Some("fresh"));

        // Same page, older tap: still stale.
        let outcome = sel.apply(SurfaceMessage::LoadingNotice {
            loading: true,
            stamp: Stamp::new(Some("new"), Some(0)),
        });
        assert_eq!(outcome, ApplyOutcome::Stale { seq: 0, latest: 1 });
    }

    #[test]
    fn restart_and_snapshot_forget_the_tap_order() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(resolved(7.0, 7.0, "seven", Some(7)));

        let mut restored: SelectionState =
            serde_json::from_str(&serde_json::to_string(&sel).unwrap()).unwrap();
        restored.apply(resolved(1.0, 1.0, "one", Some(1)));
        assert_eq!(restored.pick().map(|p| p.name.as_str()), Some("one"));

        sel.restart_sequence();
        sel.apply(resolved(2.0, 2.0, "two", Some(2)));
        assert_eq!(sel.pick().map(|p| p.name.as_str()), Some("two"));
    }

    #[test]
    fn pending_slot_holds_a_single_marker() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        let first = sel.apply(resolved(1.0, 1.0, "a", None));
        assert!(matches!(first, ApplyOutcome::Applied(ref ops) if ops.len() == 1));

        let second = sel.apply(resolved(2.0, 2.0, "b", None));
        match second {
            ApplyOutcome::Applied(ops) => {
                assert!(matches!(ops[0], MarkerOp::Remove(h) if h.latitude == 1.0));
                assert!(matches!(ops[1], MarkerOp::Add(h) if h.latitude == 2.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn my_location_never_becomes_the_pick() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(SurfaceMessage::MyLocation {
            pick: LocationPick::new(5.0, 6.0, "Aqui"),
            loading: Some(false),
        });
        assert!(sel.pick().is_none());
        assert_eq!(sel.phase(), Phase::Idle);
        assert_eq!(sel.my_location().map(|p| p.name.as_str()), Some("Aqui"));

        // Second report keeps the first marker.
        sel.apply(SurfaceMessage::MyLocation {
            pick: LocationPick::new(7.0, 8.0, "Outro"),
            loading: None,
        });
        assert_eq!(sel.my_location_marker().map(|m| m.latitude), Some(5.0));
        assert!(sel.clear_pick().is_none());
        assert!(sel.my_location_marker().is_some());
    }

    #[test]
    fn malformed_payload_changes_nothing() {
        let mut sel = SelectionState::new(ZoneVariant::Safe);
        sel.apply(loading(true, None));
        sel.apply(resolved(1.0, 2.0, "Foo", None));
        sel.apply(loading(true, None));
        let before = sel.clone();

        assert!(sel.apply_raw("{{{").is_err());
        assert!(sel.apply_raw("").is_err());
        assert_eq!(sel, before);
    }
}
