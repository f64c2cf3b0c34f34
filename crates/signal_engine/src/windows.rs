//! Per-session sliding windows
//!
//! The three PPG wavelengths share one lock so a snapshot never sees a
//! triple pushed halfway. Heart rate has its own lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::WindowConfig;

use crate::buffer::WindowBuffer;

#[derive(Debug)]
pub struct PpgWindows {
    pub green: WindowBuffer<f64>,
    pub red: WindowBuffer<f64>,
    pub ir: WindowBuffer<f64>,
}

impl PpgWindows {
    fn new(capacity: usize) -> Self {
        Self {
            green: WindowBuffer::new(capacity),
            red: WindowBuffer::new(capacity),
            ir: WindowBuffer::new(capacity),
        }
    }

    fn clear(&mut self) {
        self.green.clear();
        self.red.clear();
        self.ir.clear();
    }
}

/// Point-in-time copy of the PPG triple
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PpgSnapshot {
    pub green: Vec<f64>,
    pub red: Vec<f64>,
    pub ir: Vec<f64>,
}

impl PpgSnapshot {
    /// Shortest of the three series
    pub fn len(&self) -> usize {
        self.green.len().min(self.red.len()).min(self.ir.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Window fill levels, for gauges and status output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowFill {
    pub ppg: usize,
    pub ppg_capacity: usize,
    pub heart_rate: usize,
    pub heart_rate_capacity: usize,
}

#[derive(Debug)]
pub struct SignalWindows {
    ppg: Mutex<PpgWindows>,
    heart_rate: Mutex<WindowBuffer<f64>>,
}

impl SignalWindows {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            ppg: Mutex::new(PpgWindows::new(config.ppg_capacity)),
            heart_rate: Mutex::new(WindowBuffer::new(config.hr_capacity)),
        }
    }

    fn lock_ppg(&self) -> MutexGuard<'_, PpgWindows> {
        self.ppg.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_heart_rate(&self) -> MutexGuard<'_, WindowBuffer<f64>> {
        self.heart_rate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_ppg(&self, green: f64, red: f64, ir: f64) {
        let mut ppg = self.lock_ppg();
        ppg.green.push(green);
        ppg.red.push(red);
        ppg.ir.push(ir);
    }

    pub fn push_heart_rate(&self, bpm: f64) {
        self.lock_heart_rate().push(bpm);
    }

    pub fn snapshot_ppg(&self) -> PpgSnapshot {
        let ppg = self.lock_ppg();
        PpgSnapshot {
            green: ppg.green.snapshot_all(),
            red: ppg.red.snapshot_all(),
            ir: ppg.ir.snapshot_all(),
        }
    }

    pub fn snapshot_heart_rate(&self) -> Vec<f64> {
        self.lock_heart_rate().snapshot_all()
    }

    /// Empty every window; capacities are kept
    pub fn clear(&self) {
        self.lock_ppg().clear();
        self.lock_heart_rate().clear();
    }

    pub fn fill(&self) -> WindowFill {
        let (ppg, ppg_capacity) = {
            let ppg = self.lock_ppg();
            (ppg.green.len(), ppg.green.capacity())
        };
        let heart_rate = self.lock_heart_rate();
        WindowFill {
            ppg,
            ppg_capacity,
            heart_rate: heart_rate.len(),
            heart_rate_capacity: heart_rate.capacity(),
        }
    }

    pub fn is_empty(&self) -> bool {
        let fill = self.fill();
        fill.ppg == 0 && fill.heart_rate == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn windows(ppg_capacity: usize, hr_capacity: usize) -> SignalWindows {
        SignalWindows::new(&WindowConfig {
            ppg_capacity,
            hr_capacity,
            ..WindowConfig::default()
        })
    }

    #[test]
    fn test_ppg_triple_moves_together() {
        let windows = windows(4, 4);
        for i in 0..6 {
            let i = i as f64;
            windows.push_ppg(i, 10.0 + i, 20.0 + i);
        }

        let snapshot = windows.snapshot_ppg();
        assert_eq!(snapshot.green, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(snapshot.red, vec![12.0, 13.0, 14.0, 15.0]);
        assert_eq!(snapshot.ir, vec![22.0, 23.0, 24.0, 25.0]);
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_clear_empties_all_windows() {
        let windows = windows(8, 8);
        windows.push_ppg(1.0, 2.0, 3.0);
        windows.push_heart_rate(70.0);
        assert!(!windows.is_empty());

        windows.clear();
        assert!(windows.is_empty());
        assert!(windows.snapshot_ppg().is_empty());
        assert!(windows.snapshot_heart_rate().is_empty());
        assert_eq!(windows.fill().ppg_capacity, 8);
    }

    fn assert_aligned(snapshot: &PpgSnapshot) {
        assert_eq!(snapshot.green.len(), snapshot.red.len());
        assert_eq!(snapshot.green.len(), snapshot.ir.len());
        for ((g, r), ir) in snapshot.green.iter().zip(&snapshot.red).zip(&snapshot.ir) {
            assert_eq!(*r, g + 0.5);
            assert_eq!(*ir, g + 0.25);
        }
    }

    #[test]
    fn test_concurrent_pushes_keep_triples_aligned() {
        let windows = Arc::new(windows(1000, 8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let windows = windows.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        let v = (t * 1000 + i) as f64;
                        windows.push_ppg(v, v + 0.5, v + 0.25);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = windows.snapshot_ppg();
        assert_eq!(snapshot.len(), 400);
        assert_aligned(&snapshot);
    }

    #[test]
    fn test_snapshots_during_pushes_are_never_torn() {
        // Small window so readers also race evictions
        let windows = Arc::new(windows(64, 8));
        let writing = Arc::new(AtomicBool::new(true));

        let reader = {
            let windows = windows.clone();
            let writing = writing.clone();
            thread::spawn(move || {
                let mut reads = 0u64;
                while writing.load(Ordering::Acquire) || reads == 0 {
                    let snapshot = windows.snapshot_ppg();
                    assert!(snapshot.len() <= 64);
                    assert_aligned(&snapshot);
                    reads += 1;
                }
                reads
            })
        };

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let windows = windows.clone();
                thread::spawn(move || {
                    for i in 0..5_000 {
                        let v = (t * 10_000 + i) as f64;
                        windows.push_ppg(v, v + 0.5, v + 0.25);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        writing.store(false, Ordering::Release);

        assert!(reader.join().unwrap() > 0);
        assert_eq!(windows.snapshot_ppg().len(), 64);
    }
}
