//! # Signal Engine
//!
//! 生理信号推导与快照组装引擎。
//!
//! 负责：
//! - 滑动窗口缓冲 (PPG 三通道共享一把锁)
//! - 慢节拍：BVP / SpO2 / 呼吸率推导
//! - 快节拍：按新鲜度合并实时值、模拟值与默认值，输出 `OutgoingSnapshot`
//! - 会话生命周期 (Idle / Active) 与任务监管
//!
//! ## 使用示例
//!
//! ```ignore
//! use signal_engine::{Session, StartOutcome};
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::channel(64);
//! let mut session = Session::new(config, service, tx);
//!
//! if let StartOutcome::Started(report) = session.start(&channels).await? {
//!     println!("subscribed: {:?}", report.subscribed);
//! }
//!
//! while let Some(snapshot) = rx.recv().await {
//!     // Forward to sinks
//! }
//!
//! session.stop().await;
//! ```

mod assembler;
mod buffer;
mod calculator;
pub mod dsp;
mod error;
mod ingest;
mod session;
mod simulation;
mod staleness;
mod state;
mod windows;

pub use assembler::{publish, run_snapshot_loop, SnapshotAssembler};
pub use buffer::WindowBuffer;
pub use calculator::{run_processing_loop, MetricsCalculator};
pub use contracts::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, MetricError, Result};
pub use ingest::{run_ingest_loop, SampleIngest};
pub use session::{Session, SessionStatus, StartOutcome, StartReport};
pub use simulation::{ecg_template, SimulatedValues, SimulationState};
pub use staleness::{is_off_wrist, Freshness, StalenessResolver};
pub use state::{DerivedCache, LatestStore, SharedState};
pub use windows::{PpgSnapshot, SignalWindows, WindowFill};

// Re-export contracts types
pub use contracts::{DerivedMetrics, EngineConfig, LatestRecord, OutgoingSnapshot};
