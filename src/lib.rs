pub mod animation;
pub mod arbiter;
pub mod button;
pub mod config;
pub mod controller;
pub mod mode;
pub mod status;
pub mod strip;

pub mod prelude {
    pub use crate::{
        animation::{AnimationEngine, LedSettings, RenderCursor, StripSlot},
        arbiter::{ArbiterState, ModeArbiter, Outbound, StateCell},
        button::*,
        config::*,
        controller::*,
        mode::Mode,
        status::{PeerEvent, StatusChannel},
        strip::{MemoryStrip, Strip, StripDriver},
    };
}
