use std::fmt::{Display, Formatter, Result as FmtResult};

/// Lifecycle of a streamed media job.
///
/// `Staged → Compressing → Compressed → Segmenting → SegmentedReady`, with `Failed`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoState {
    Staged,
    Compressing,
    Compressed,
    Segmenting,
    SegmentedReady,
    Failed,
}

impl VideoState {
    /// Successor on the happy path.
    pub fn next(self) -> Option<Self> {
        match self {
            VideoState::Staged => Some(VideoState::Compressing),
            VideoState::Compressing => Some(VideoState::Compressed),
            VideoState::Compressed => Some(VideoState::Segmenting),
            VideoState::Segmenting => Some(VideoState::SegmentedReady),
            VideoState::SegmentedReady | VideoState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, VideoState::SegmentedReady | VideoState::Failed)
    }

    pub fn can_transition_to(self, to: VideoState) -> bool {
        match to {
            VideoState::Failed => !self.is_terminal(),
            other => self.next() == Some(other),
        }
    }
}

impl Display for VideoState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            VideoState::Staged => "staged",
            VideoState::Compressing => "compressing",
            VideoState::Compressed => "compressed",
            VideoState::Segmenting => "segmenting",
            VideoState::SegmentedReady => "segmented_ready",
            VideoState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Tracks and logs the state of one job.
#[derive(Debug)]
pub struct StageTracker {
    file_name: String,
    state: VideoState,
    history: Vec<VideoState>,
}

impl StageTracker {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            state: VideoState::Staged,
            history: vec![VideoState::Staged],
        }
    }

    pub fn state(&self) -> VideoState {
        self.state
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[VideoState] {
        &self.history
    }

    /// Move to the next happy-path state. Returns false if already terminal.
    pub fn advance(&mut self) -> bool {
        match self.state.next() {
            Some(next) => {
                tracing::debug!(
                    file_name = %self.file_name,
                    from = %self.state,
                    to = %next,
                    "Media job state change"
                );
                self.set(next);
                true
            }
            None => false,
        }
    }

    /// Enter `Failed`, logging the state the job failed in.
    pub fn fail(&mut self, reason: &dyn std::error::Error) {
        if !self.state.can_transition_to(VideoState::Failed) {
            return;
        }
        tracing::warn!(
            file_name = %self.file_name,
            state = %self.state,
            error = %reason,
            "Media job failed"
        );
        self.set(VideoState::Failed);
    }

    fn set(&mut self, state: VideoState) {
        self.state = state;
        self.history.push(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_visits_every_state_in_order() {
        let mut tracker = StageTracker::new("clip.mp4");
        while tracker.advance() {}
        assert_eq!(
            tracker.history(),
            &[
                VideoState::Staged,
                VideoState::Compressing,
                VideoState::Compressed,
                VideoState::Segmenting,
                VideoState::SegmentedReady,
            ]
        );
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        for state in [
            VideoState::Staged,
            VideoState::Compressing,
            VideoState::Compressed,
            VideoState::Segmenting,
        ] {
            assert!(state.can_transition_to(VideoState::Failed));
        }
        assert!(!VideoState::SegmentedReady.can_transition_to(VideoState::Failed));
        assert!(!VideoState::Failed.can_transition_to(VideoState::Failed));
        assert!(!VideoState::Staged.can_transition_to(VideoState::Segmenting));
    }

    #[test]
    fn fail_is_terminal() {
        let err = std::io::Error::other("encoder crashed");
        let mut tracker = StageTracker::new("clip.mp4");
        tracker.advance();
        tracker.fail(&err);
        assert_eq!(tracker.state(), VideoState::Failed);
        assert!(!tracker.advance());
        assert_eq!(tracker.history().last(), Some(&VideoState::Failed));
    }
}
