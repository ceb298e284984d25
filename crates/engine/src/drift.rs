use sparty_core::NowPlaying;

/// A member drifts when it plays a different track than the owner's recorded
/// one, or when its offset is more than `tolerance_ms` away from the owner's.
pub fn needs_correction(
    owner_uri: &str,
    owner_offset_ms: u64,
    member: &NowPlaying,
    tolerance_ms: u64,
) -> bool {
    member.track.uri != owner_uri || member.progress_ms.abs_diff(owner_offset_ms) > tolerance_ms
}
