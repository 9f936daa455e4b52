//! Per-stream recording state.
//!
//! One `StreamState` is owned by each (camera, modality) worker and holds a
//! `WindowState` per record task, created the first time the window is
//! checked. Warning flags are one-shot for the process lifetime; recording
//! re-arms on every loop of the source.

use std::collections::{HashMap, HashSet};

use camwatch_models::RecordTask;

/// Identifies a record window within a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowKey {
    pub start: u32,
    pub end: u32,
}

impl From<&RecordTask> for WindowKey {
    fn from(task: &RecordTask) -> Self {
        Self {
            start: task.start_frame,
            end: task.end_frame,
        }
    }
}

#[derive(Debug)]
struct WindowState<F> {
    warning_shown: bool,
    warning_judged: bool,
    recording: bool,
    buffer: Vec<F>,
    last_frame: u32,
}

impl<F> WindowState<F> {
    fn new() -> Self {
        Self {
            warning_shown: false,
            warning_judged: false,
            recording: false,
            buffer: Vec::new(),
            last_frame: 0,
        }
    }

    /// Take the buffered clip and disarm recording.
    fn take_clip(&mut self, task: &RecordTask) -> Option<ClipFlush<F>> {
        self.recording = false;
        let frames = std::mem::take(&mut self.buffer);
        if frames.is_empty() {
            return None;
        }
        let first = self.last_frame.saturating_sub(frames.len() as u32 - 1);
        Some(ClipFlush {
            task: task.clone(),
            frames,
            range: (first, self.last_frame),
        })
    }
}

/// A finished window's buffered frames.
#[derive(Debug)]
pub struct ClipFlush<F> {
    pub task: RecordTask,
    pub frames: Vec<F>,
    /// First and last frame index held in `frames`
    pub range: (u32, u32),
}

/// Transition produced by a frame.
#[derive(Debug)]
pub enum WindowAction<F> {
    /// The window start was reached for the first time.
    ShowWarning(WindowKey),
    /// The judge offset was reached for the first time.
    JudgeWarning(WindowKey),
    /// The window ended; its clip should be finalized.
    Flush(ClipFlush<F>),
}

/// Recording state of one stream.
#[derive(Debug)]
pub struct StreamState<F> {
    current_frame: Option<u32>,
    windows: HashMap<WindowKey, WindowState<F>>,
    narrated: HashSet<(u32, u32)>,
}

impl<F> Default for StreamState<F> {
    fn default() -> Self {
        Self {
            current_frame: None,
            windows: HashMap::new(),
            narrated: HashSet::new(),
        }
    }
}

impl<F: Clone> StreamState<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the last frame seen.
    pub fn current_frame(&self) -> Option<u32> {
        self.current_frame
    }

    /// Whether `window` is currently buffering frames.
    pub fn is_recording(&self, window: WindowKey) -> bool {
        self.windows.get(&window).is_some_and(|w| w.recording)
    }

    /// Number of frames buffered for `window`.
    pub fn buffered(&self, window: WindowKey) -> usize {
        self.windows.get(&window).map_or(0, |w| w.buffer.len())
    }

    /// Feed one decoded frame and collect the transitions it triggers.
    ///
    /// A frame index not greater than the previous one means the source
    /// looped; windows still recording are flushed first.
    pub fn advance(&mut self, index: u32, frame: &F, tasks: &[RecordTask], judge_offset: u32) -> Vec<WindowAction<F>> {
        let mut actions = Vec::new();

        if self.current_frame.is_some_and(|prev| index <= prev) {
            actions.extend(self.flush_active(tasks));
        }
        self.current_frame = Some(index);

        for task in tasks {
            let key = WindowKey::from(task);
            let window = self.windows.entry(key).or_insert_with(WindowState::new);

            if index == task.start_frame && !window.warning_shown {
                window.warning_shown = true;
                actions.push(WindowAction::ShowWarning(key));
            }

            if index == task.start_frame.saturating_add(judge_offset) && !window.warning_judged {
                window.warning_judged = true;
                actions.push(WindowAction::JudgeWarning(key));
            }

            if task.contains(index) {
                window.buffer.push(frame.clone());
                window.recording = true;
                window.last_frame = index;
            } else if index > task.end_frame && window.recording {
                if let Some(flush) = window.take_clip(task) {
                    actions.push(WindowAction::Flush(flush));
                }
            }
        }

        actions
    }

    /// Flush every window that is still recording.
    pub fn flush_active(&mut self, tasks: &[RecordTask]) -> Vec<WindowAction<F>> {
        tasks
            .iter()
            .filter_map(|task| {
                let window = self.windows.get_mut(&WindowKey::from(task))?;
                if !window.recording {
                    return None;
                }
                window.take_clip(task).map(WindowAction::Flush)
            })
            .collect()
    }

    /// Record that a position cluster was narrated. Returns `false` if it
    /// already was.
    pub fn mark_narrated(&mut self, extent: (u32, u32)) -> bool {
        self.narrated.insert(extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(start: u32, end: u32) -> RecordTask {
        RecordTask {
            start_frame: start,
            end_frame: end,
            dominant_label: "0".to_string(),
            average_confidence: 0.9,
        }
    }

    /// Play `loops` passes over a `len`-frame video, frames carrying their own index.
    fn play(state: &mut StreamState<u32>, tasks: &[RecordTask], len: u32, loops: u32, offset: u32) -> Vec<WindowAction<u32>> {
        let mut actions = Vec::new();
        for _ in 0..loops {
            for i in 0..len {
                actions.extend(state.advance(i, &i, tasks, offset));
            }
        }
        actions
    }

    fn flushes(actions: &[WindowAction<u32>]) -> Vec<&ClipFlush<u32>> {
        actions
            .iter()
            .filter_map(|a| match a {
                WindowAction::Flush(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_buffers_window_and_flushes_after_end() {
        let tasks = vec![task(10, 20)];
        let mut state = StreamState::new();
        let key = WindowKey { start: 10, end: 20 };

        for i in 0..=20 {
            let actions = state.advance(i, &i, &tasks, 150);
            assert!(flushes(&actions).is_empty());
        }
        assert!(state.is_recording(key));
        assert_eq!(state.buffered(key), 11);

        let actions = state.advance(21, &21, &tasks, 150);
        let flushed = flushes(&actions);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].frames, (10..=20).collect::<Vec<u32>>());
        assert_eq!(flushed[0].range, (10, 20));
        assert!(!state.is_recording(key));
        assert_eq!(state.buffered(key), 0);

        assert!(flushes(&state.advance(22, &22, &tasks, 150)).is_empty());
    }

    #[test]
    fn test_warning_flags_are_one_shot_across_loops() {
        let tasks = vec![task(10, 20)];
        let mut state = StreamState::new();
        let actions = play(&mut state, &tasks, 40, 3, 15);

        let shown = actions.iter().filter(|a| matches!(a, WindowAction::ShowWarning(_))).count();
        let judged = actions.iter().filter(|a| matches!(a, WindowAction::JudgeWarning(_))).count();
        assert_eq!(shown, 1);
        assert_eq!(judged, 1);
        assert_eq!(flushes(&actions).len(), 3);
    }

    #[test]
    fn test_loop_flushes_window_cut_by_wrap() {
        let tasks = vec![task(25, 40)];
        let mut state = StreamState::new();
        let actions = play(&mut state, &tasks, 30, 1, 150);
        assert!(flushes(&actions).is_empty());

        let actions = state.advance(0, &0, &tasks, 150);
        let flushed = flushes(&actions);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].range, (25, 29));
        assert_eq!(flushed[0].frames.len(), 5);
    }

    #[test]
    fn test_overlapping_windows_are_independent() {
        let tasks = vec![task(5, 15), task(10, 12)];
        let mut state = StreamState::new();
        let actions = play(&mut state, &tasks, 20, 1, 150);

        let flushed = flushes(&actions);
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0].range, (10, 12));
        assert_eq!(flushed[1].range, (5, 15));
        assert_eq!(flushed[1].frames.len(), 11);
    }

    #[test]
    fn test_identical_replays_give_identical_ranges() {
        let tasks = vec![task(3, 8), task(30, 45)];
        let ranges = |state: &mut StreamState<u32>| {
            flushes(&play(state, &tasks, 50, 2, 150))
                .iter()
                .map(|f| f.range)
                .collect::<Vec<_>>()
        };
        assert_eq!(ranges(&mut StreamState::new()), ranges(&mut StreamState::new()));
    }

    #[test]
    fn test_mark_narrated() {
        let mut state: StreamState<u32> = StreamState::new();
        assert!(state.mark_narrated((10, 12)));
        assert!(!state.mark_narrated((10, 12)));
        assert!(state.mark_narrated((10, 13)));
    }
}
