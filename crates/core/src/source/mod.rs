//! Frame sources: the seam between the broadcast loop and the external
//! capture + detection stage.

use std::{
    collections::VecDeque,
    io::BufRead,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{landmarks::DetectionFrame, HandCursorError, Result};

/// Produces detector results one frame at a time.
pub trait FrameSource: Send {
    /// `Ok(Some(_))` yields a frame, `Ok(None)` means the source is exhausted
    /// and `Err(_)` a transient failure the caller may retry.
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>>;

    /// Releases the underlying capture resource.
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// One scripted step: a frame or an injected acquisition failure.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Frame(DetectionFrame),
    Fail(String),
}

/// In-memory source that plays back a fixed script, then reports exhaustion.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
    released: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_frames(frames: impl IntoIterator<Item = DetectionFrame>) -> Self {
        Self::new(frames.into_iter().map(ScriptStep::Frame))
    }

    /// Flag that flips to `true` once [`FrameSource::release`] has run. It
    /// stays readable after the source has been moved into a loop.
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        match self.steps.pop_front() {
            Some(ScriptStep::Frame(frame)) => Ok(Some(frame)),
            Some(ScriptStep::Fail(reason)) => Err(HandCursorError::acquisition(reason)),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.steps.clear();
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Replays detector results recorded as newline-delimited JSON.
pub struct ReplaySource<R> {
    reader: Option<R>,
    line: String,
    line_number: usize,
}

impl<R: BufRead + Send> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            line: String::new(),
            line_number: 0,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead + Send> FrameSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        loop {
            self.line.clear();
            let read = reader
                .read_line(&mut self.line)
                .map_err(|err| HandCursorError::acquisition(format!("read failed: {err}")))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed).map(Some).map_err(|err| {
                HandCursorError::acquisition(format!(
                    "line {}: malformed frame: {err}",
                    self.line_number
                ))
            });
        }
    }

    fn release(&mut self) {
        self.reader = None;
    }
}

impl<R> std::fmt::Debug for ReplaySource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySource")
            .field("open", &self.reader.is_some())
            .field("line_number", &self.line_number)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn scripted_source_plays_steps_in_order() {
        let mut source = ScriptedSource::new([
            ScriptStep::Frame(DetectionFrame::empty(640, 480)),
            ScriptStep::Fail("camera busy".to_string()),
        ]);

        assert!(source.next_frame().unwrap().is_some());
        let err = source.next_frame().unwrap_err();
        assert!(err.is_acquisition());
        assert!(format!("{err}").contains("camera busy"));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn release_is_observable_after_move() {
        let source = ScriptedSource::from_frames([DetectionFrame::empty(640, 480)]);
        let released = source.released_flag();

        let mut boxed: Box<dyn FrameSource> = Box::new(source);
        boxed.release();

        assert!(released.load(Ordering::SeqCst));
        assert!(boxed.next_frame().unwrap().is_none());
    }

    #[test]
    fn replay_skips_blank_lines_and_reports_bad_ones() {
        let input = concat!(
            r#"{"width":640,"height":480,"hands":[]}"#,
            "\n\n",
            "not json\n",
            r#"{"width":320,"height":240}"#,
            "\n",
        );
        let mut source = ReplaySource::new(Cursor::new(input));

        assert_eq!(source.next_frame().unwrap().unwrap().width, 640);
        let err = source.next_frame().unwrap_err();
        assert!(err.is_acquisition());
        assert!(format!("{err}").contains("line 3"));
        assert_eq!(source.next_frame().unwrap().unwrap().width, 320);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn released_replay_is_exhausted() {
        let mut source = ReplaySource::new(Cursor::new("{\"width\":1,\"height\":1}\n"));
        source.release();
        assert!(source.next_frame().unwrap().is_none());
    }
}
