//! Parse `git clone --progress` output into transfer updates.

use launchpad_core::TransferUpdate;

/// Phases of a clone, in the order git reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClonePhase {
    Counting,
    Compressing,
    Receiving,
    Resolving,
    CheckingOut,
}

impl ClonePhase {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Counting objects" => Some(Self::Counting),
            "Compressing objects" => Some(Self::Compressing),
            "Receiving objects" => Some(Self::Receiving),
            "Resolving deltas" => Some(Self::Resolving),
            "Updating files" | "Checking out files" => Some(Self::CheckingOut),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Counting => "Counting objects",
            Self::Compressing => "Compressing objects",
            Self::Receiving => "Receiving objects",
            Self::Resolving => "Resolving deltas",
            Self::CheckingOut => "Checking out files",
        }
    }

    /// Share of the whole clone covered by this phase.
    const fn span(self) -> (f32, f32) {
        match self {
            Self::Counting => (0.0, 0.05),
            Self::Compressing => (0.05, 0.10),
            Self::Receiving => (0.10, 0.80),
            Self::Resolving => (0.80, 0.95),
            Self::CheckingOut => (0.95, 1.0),
        }
    }
}

/// One recognised progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitProgressLine {
    pub phase: ClonePhase,
    pub percent: u8,
    pub current: u64,
    pub total: u64,
}

impl GitProgressLine {
    /// Completion of the whole clone implied by this line.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        let (lo, hi) = self.phase.span();
        lo + (hi - lo) * f32::from(self.percent.min(100)) / 100.0
    }

    #[must_use]
    pub fn to_update(&self) -> TransferUpdate {
        TransferUpdate::new(self.phase.label(), self.current, self.total, self.fraction())
    }
}

/// Parse lines such as `Receiving objects:  45% (450/1000), 1.2 MiB | 2 MiB/s`.
///
/// Server-side phases arrive prefixed with `remote:`. Anything that is not a
/// percentage line returns `None`.
pub fn parse_progress_line(line: &str) -> Option<GitProgressLine> {
    let line = line.trim();
    let line = line.strip_prefix("remote:").map_or(line, str::trim_start);

    let (label, rest) = line.split_once(':')?;
    let phase = ClonePhase::from_label(label.trim())?;

    let (pct, rest) = rest.split_once('%')?;
    let percent = pct.trim().parse::<u8>().ok()?;

    let counts = rest.trim_start().strip_prefix('(')?;
    let (counts, _) = counts.split_once(')')?;
    let (current, total) = counts.split_once('/')?;

    Some(GitProgressLine {
        phase,
        percent,
        current: current.trim().parse().ok()?,
        total: total.trim().parse().ok()?,
    })
}
