use std::fmt::{self, Display};

/// The two animation modes a strand can be in. The discriminant is the code
/// exchanged with the peer over the status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Mode {
    /// Ambient breathing pulse
    #[default]
    Idle = 0,
    /// Scanning highlight at peak brightness
    Active = 1,
}

impl Mode {
    pub const COUNT: usize = 2;
    pub const ALL: [Mode; Mode::COUNT] = [Mode::Idle, Mode::Active];

    pub fn code(self) -> i64 {
        self as i64
    }

    /// Position of this mode in per-mode tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<i64> for Mode {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Mode::Idle),
            1 => Ok(Mode::Active),
            other => Err(other),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "idle"),
            Mode::Active => write!(f, "active"),
        }
    }
}
