use crate::error::{VideoError, VideoResult};
use crate::tools::Frame;

/// 視窗聚合器狀態
///
/// `AwaitingFrames → ScoringWindow → DispatchingBest → AwaitingFrames`，
/// 沒有剩餘視窗或解碼串流結束時進入 `Drained`（終止狀態）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    AwaitingFrames,
    ScoringWindow,
    DispatchingBest,
    Drained,
}

/// 被選出的最清晰影格
#[derive(Debug, Clone)]
pub struct SelectedFrame {
    pub window_index: u64,
    /// 影格在視窗內的位置
    pub offset: usize,
    pub score: f64,
    pub frame: Frame,
}

/// 一秒鐘的影格與對應分數，兩者長度永遠相同
#[derive(Debug)]
struct Window {
    index: u64,
    frames: Vec<Frame>,
    scores: Vec<f64>,
}

impl Window {
    fn new(index: u64, capacity: usize) -> Self {
        Self {
            index,
            frames: Vec::with_capacity(capacity),
            scores: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, frame: Frame, score: f64) {
        self.frames.push(frame);
        self.scores.push(score);
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn into_best(mut self) -> Option<SelectedFrame> {
        let offset = select_best(&self.scores)?;
        let score = self.scores[offset];
        let frame = self.frames.swap_remove(offset);
        Some(SelectedFrame {
            window_index: self.index,
            offset,
            score,
            frame,
        })
    }
}

/// 取最大分數的位置，同分時取最前面的
///
/// 空序列回傳 `None`；NaN 永遠不會勝過可比較的分數。
#[must_use]
pub fn select_best(scores: &[f64]) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            None if !score.is_nan() => best = Some((index, score)),
            Some((_, current)) if score > current => best = Some((index, score)),
            _ => {}
        }
    }

    Some(best.map_or(0, |(index, _)| index))
}

/// 將依序到達的影格切成每 `fps` 張一個視窗，並選出每個視窗的最清晰影格
///
/// 視窗總數為 `frame_count / fps`（無條件捨去），最後不足一秒的影格不處理。
#[derive(Debug)]
pub struct WindowAggregator {
    fps: usize,
    total_windows: u64,
    next_window: u64,
    current: Option<Window>,
    state: AggregatorState,
}

impl WindowAggregator {
    pub fn new(fps: u32, frame_count: u64) -> VideoResult<Self> {
        if fps == 0 {
            return Err(VideoError::config("fps 為 0，無法切分每秒視窗"));
        }

        Ok(Self {
            fps: fps as usize,
            total_windows: frame_count / u64::from(fps),
            next_window: 0,
            current: None,
            state: AggregatorState::AwaitingFrames,
        })
    }

    #[must_use]
    pub const fn total_windows(&self) -> u64 {
        self.total_windows
    }

    #[must_use]
    pub const fn state(&self) -> AggregatorState {
        self.state
    }

    /// 已開始的視窗數
    #[must_use]
    pub const fn windows_started(&self) -> u64 {
        self.next_window
    }

    /// 開始下一個視窗，回傳視窗編號；沒有剩餘視窗時轉為 `Drained`
    pub fn begin_window(&mut self) -> Option<u64> {
        match self.state {
            AggregatorState::Drained => None,
            AggregatorState::ScoringWindow | AggregatorState::DispatchingBest => {
                self.current.as_ref().map(|w| w.index)
            }
            AggregatorState::AwaitingFrames => {
                if self.next_window >= self.total_windows {
                    self.state = AggregatorState::Drained;
                    return None;
                }

                let index = self.next_window;
                self.next_window += 1;
                self.current = Some(Window::new(index, self.fps));
                self.state = AggregatorState::ScoringWindow;
                Some(index)
            }
        }
    }

    /// 加入一張已評分的影格，回傳目前視窗是否已滿
    pub fn accept(&mut self, frame: Frame, score: f64) -> bool {
        match self.current.as_mut() {
            Some(window) if self.state == AggregatorState::ScoringWindow => {
                window.push(frame, score);
                window.len() >= self.fps
            }
            _ => true,
        }
    }

    #[must_use]
    pub fn is_window_full(&self) -> bool {
        self.current.as_ref().is_none_or(|w| w.len() >= self.fps)
    }

    /// 結束目前視窗：選出最清晰影格交給 `dispatch`，然後丟棄整個視窗
    ///
    /// 空視窗不會呼叫 `dispatch`，回傳 `false`。
    pub fn finish_window<F>(&mut self, dispatch: F) -> bool
    where
        F: FnOnce(SelectedFrame),
    {
        let Some(window) = self.current.take() else {
            return false;
        };

        self.state = AggregatorState::DispatchingBest;
        let dispatched = match window.into_best() {
            Some(selected) => {
                dispatch(selected);
                true
            }
            None => false,
        };

        self.state = AggregatorState::AwaitingFrames;
        dispatched
    }

    /// 解碼串流結束，捨棄尚未完成的視窗
    pub fn drain(&mut self) {
        self.current = None;
        self.state = AggregatorState::Drained;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> Frame {
        Frame::new(index, 1, 1, 1, vec![index as u8])
    }

    #[test]
    fn test_select_best_first_max_wins() {
        assert_eq!(select_best(&[1.0, 5.2, 3.1]), Some(1));
        assert_eq!(select_best(&[2.0, 7.0, 7.0, 1.0]), Some(1));
        assert_eq!(select_best(&[4.0, 4.0, 4.0]), Some(0));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_select_best_ignores_nan() {
        assert_eq!(select_best(&[f64::NAN, 1.0, 0.5]), Some(1));
        assert_eq!(select_best(&[f64::NAN, f64::NAN]), Some(0));
    }

    #[test]
    fn test_zero_fps_is_config_error() {
        assert!(matches!(
            WindowAggregator::new(0, 100),
            Err(VideoError::Config(_))
        ));
    }

    #[test]
    fn test_total_windows_floor() {
        assert_eq!(WindowAggregator::new(30, 300).unwrap().total_windows(), 10);
        assert_eq!(WindowAggregator::new(30, 329).unwrap().total_windows(), 10);
        assert_eq!(WindowAggregator::new(30, 29).unwrap().total_windows(), 0);
    }

    #[test]
    fn test_state_machine_cycle() {
        let mut aggregator = WindowAggregator::new(2, 4).unwrap();
        assert_eq!(aggregator.state(), AggregatorState::AwaitingFrames);

        assert_eq!(aggregator.begin_window(), Some(0));
        assert_eq!(aggregator.state(), AggregatorState::ScoringWindow);
        assert!(!aggregator.accept(frame(0), 1.0));
        assert!(aggregator.accept(frame(1), 3.0));

        let mut observed = None;
        assert!(aggregator.finish_window(|selected| observed = Some(selected)));
        let selected = observed.unwrap();
        assert_eq!(selected.window_index, 0);
        assert_eq!(selected.frame.index, 1);
        assert_eq!(aggregator.state(), AggregatorState::AwaitingFrames);

        assert_eq!(aggregator.begin_window(), Some(1));
        aggregator.accept(frame(2), 9.0);
        aggregator.accept(frame(3), 9.0);
        let mut observed = None;
        aggregator.finish_window(|selected| observed = Some(selected));
        assert_eq!(observed.unwrap().frame.index, 2);

        assert_eq!(aggregator.begin_window(), None);
        assert_eq!(aggregator.state(), AggregatorState::Drained);
        assert_eq!(aggregator.windows_started(), 2);
    }

    #[test]
    fn test_short_window_still_selected() {
        let mut aggregator = WindowAggregator::new(30, 60).unwrap();
        aggregator.begin_window();
        aggregator.accept(frame(0), 0.5);
        aggregator.accept(frame(1), 0.7);
        assert!(!aggregator.is_window_full());

        let mut observed = None;
        assert!(aggregator.finish_window(|selected| observed = Some(selected)));
        assert_eq!(observed.unwrap().offset, 1);
    }

    #[test]
    fn test_empty_window_is_skipped() {
        let mut aggregator = WindowAggregator::new(30, 60).unwrap();
        aggregator.begin_window();
        let mut called = false;
        assert!(!aggregator.finish_window(|_| called = true));
        assert!(!called);
    }

    #[test]
    fn test_drained_refuses_new_windows() {
        let mut aggregator = WindowAggregator::new(1, 10).unwrap();
        aggregator.begin_window();
        aggregator.drain();
        assert_eq!(aggregator.begin_window(), None);
        assert_eq!(aggregator.state(), AggregatorState::Drained);
    }
}
