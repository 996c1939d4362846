//! Fog-free capture via a render-target redirect.
//!
//! Flipping fog off while armed points the primary camera's composite at the
//! color channel buffer so base captures come out fog-free; flipping it back
//! restores the target recorded at arm time. The latch is inverted while
//! disarmed so re-arming always recomputes the redirect on the next frame.

/// Where the primary camera should composite after a fog transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogTarget {
    /// Redirect into the color channel buffer (fog disabled).
    ColorBuffer,
    /// Restore the target captured at arm time (fog enabled).
    Original,
}

#[derive(Debug)]
pub struct FogOverride {
    last_applied: bool,
}

impl FogOverride {
    pub fn new(fog_enabled: bool) -> Self {
        // Start out of sync so the first armed frame applies a redirect.
        Self {
            last_applied: !fog_enabled,
        }
    }

    /// Per-frame latch update. Returns the redirect to apply, if the fog
    /// value changed since the last applied state while armed.
    pub fn apply(&mut self, armed: bool, fog_enabled: bool) -> Option<FogTarget> {
        if !armed {
            self.last_applied = !fog_enabled;
            return None;
        }
        if self.last_applied == fog_enabled {
            return None;
        }
        self.last_applied = fog_enabled;
        Some(if fog_enabled {
            FogTarget::Original
        } else {
            FogTarget::ColorBuffer
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fog_off_redirects_to_color_buffer() {
        let mut fog = FogOverride::new(true);
        // arm with fog on: first frame restores the original target
        assert_eq!(fog.apply(true, true), Some(FogTarget::Original));
        assert_eq!(fog.apply(true, true), None);
        // toggle off then on
        assert_eq!(fog.apply(true, false), Some(FogTarget::ColorBuffer));
        assert_eq!(fog.apply(true, false), None);
        assert_eq!(fog.apply(true, true), Some(FogTarget::Original));
    }

    #[test]
    fn disarmed_frames_apply_nothing_and_invert_the_latch() {
        let mut fog = FogOverride::new(true);
        assert_eq!(fog.apply(false, true), None);
        assert_eq!(fog.apply(false, true), None);
        // re-arm forces a redirect recomputation on the next frame
        assert_eq!(fog.apply(true, true), Some(FogTarget::Original));
    }

    #[test]
    fn rearm_recomputes_even_when_fog_stayed_off() {
        let mut fog = FogOverride::new(true);
        assert_eq!(fog.apply(true, false), Some(FogTarget::ColorBuffer));
        // disarm; fog stays off
        assert_eq!(fog.apply(false, false), None);
        // re-arm: redirect must be re-applied, not assumed still in place
        assert_eq!(fog.apply(true, false), Some(FogTarget::ColorBuffer));
    }
}
