//! Direction-change confirmation from up to four independent signals.
//!
//! The device compass is the most trusted signal and short-circuits the
//! rest. GPS bearing and velocity reversal stand on their own; proximity to
//! the last turn point only ever corroborates in strict mode.

use crate::{
    config::ShuttleProfile,
    geometry::{bearing_deg, displacement_cosine, haversine_m, heading_diff_deg},
    sample::PositionFix,
};

use super::PositionHistory;

/// Fix-to-fix displacements shorter than this carry no usable bearing.
const MIN_LEG_M: f64 = 0.3;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    DeviceHeading,
    GpsBearing,
    VelocityReversal,
    Approach,
}

/// Everything `confirm_turn` looks at, threaded in explicitly. The
/// previous device heading lives in the tracker state, never in ambient
/// context.
pub struct TurnInputs<'a> {
    /// fixes before `current`, oldest first
    pub history: &'a PositionHistory,
    pub current: &'a PositionFix,
    pub prev_device_heading: Option<f32>,
    /// the turn point the athlete is running back toward
    pub reference_position: Option<(f64, f64)>,
    /// previous fix's distance to that turn point
    pub prev_distance_to_reference_m: Option<f64>,
}

/// Combine the signals by priority.
///
/// Non-strict: any one signal confirms. Strict (used while paused at a
/// milestone, where GPS jitter is the enemy): the compass alone confirms;
/// otherwise bearing or velocity reversal must fire, and the approach
/// signal is never sufficient by itself.
pub fn confirm_turn(
    profile: &ShuttleProfile,
    inputs: &TurnInputs,
    strict: bool,
) -> Option<TurnSignal> {
    if device_heading_flipped(profile, inputs, strict) {
        return Some(TurnSignal::DeviceHeading);
    }

    if bearing_flipped(profile, inputs, strict) {
        return Some(TurnSignal::GpsBearing);
    }

    if velocity_reversed(profile, inputs, strict) {
        return Some(TurnSignal::VelocityReversal);
    }

    if !strict && approaching_reference(profile, inputs) {
        return Some(TurnSignal::Approach);
    }

    None
}

fn device_heading_flipped(profile: &ShuttleProfile, inputs: &TurnInputs, strict: bool) -> bool {
    let (Some(prev), Some(current)) = (inputs.prev_device_heading, inputs.current.heading_deg)
    else {
        return false;
    };
    let threshold = if strict {
        profile.strict_heading_delta_deg
    } else {
        profile.heading_delta_deg
    };
    heading_diff_deg(prev, current) >= threshold
}

/// The fix `n_back` positions before the newest history entry.
fn recent(history: &PositionHistory, n_back: usize) -> Option<&PositionFix> {
    let len = history.len();
    if n_back >= len {
        return None;
    }
    history.iter().nth(len - 1 - n_back)
}

/// Bearing(before -> mid) against bearing(mid -> current), with `before`
/// taken two or three fixes back so a single jittery fix cannot fake a
/// turn.
fn bearing_flipped(profile: &ShuttleProfile, inputs: &TurnInputs, strict: bool) -> bool {
    let Some(mid) = recent(inputs.history, 0) else {
        return false;
    };
    let Some(before) = recent(inputs.history, 2).or_else(|| recent(inputs.history, 1)) else {
        return false;
    };

    let mid = mid.lat_lon();
    let before = before.lat_lon();
    let current = inputs.current.lat_lon();
    if haversine_m(before, mid) < MIN_LEG_M || haversine_m(mid, current) < MIN_LEG_M {
        return false;
    }

    let inbound = bearing_deg(before, mid) as f32;
    let outbound = bearing_deg(mid, current) as f32;
    let threshold = if strict {
        profile.strict_bearing_delta_deg
    } else {
        profile.bearing_delta_deg
    };
    heading_diff_deg(inbound, outbound) >= threshold
}

fn velocity_reversed(profile: &ShuttleProfile, inputs: &TurnInputs, strict: bool) -> bool {
    let (Some(mid), Some(prev)) = (recent(inputs.history, 0), recent(inputs.history, 1)) else {
        return false;
    };
    let Some(cosine) =
        displacement_cosine(prev.lat_lon(), mid.lat_lon(), inputs.current.lat_lon())
    else {
        return false;
    };
    let ceiling = if strict {
        profile.strict_velocity_cosine_max
    } else {
        profile.velocity_cosine_max
    };
    cosine < ceiling
}

fn approaching_reference(profile: &ShuttleProfile, inputs: &TurnInputs) -> bool {
    let (Some(reference), Some(prev_distance)) = (
        inputs.reference_position,
        inputs.prev_distance_to_reference_m,
    ) else {
        return false;
    };
    let current_distance = haversine_m(inputs.current.lat_lon(), reference);
    prev_distance - current_distance > profile.approach_delta_m
}
