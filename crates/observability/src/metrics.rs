//! 快照指标统计模块
//!
//! 指标描述注册，以及基于 `OutgoingSnapshot` 的内存聚合统计。

use contracts::OutgoingSnapshot;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// 注册所有 `biosync_` 指标的描述
///
/// 在安装 Prometheus recorder 之后调用，使 `# HELP` 行带上说明文字。
pub fn describe_metrics() {
    describe_counter!(
        "biosync_samples_received_total",
        "Samples decoded and forwarded, by channel"
    );
    describe_counter!(
        "biosync_samples_dropped_total",
        "Samples discarded by the ingestion backpressure policy"
    );
    describe_counter!(
        "biosync_decode_errors_total",
        "Data points that failed to decode, by channel"
    );
    describe_counter!(
        "biosync_snapshots_emitted_total",
        "Snapshots accepted by the outbox"
    );
    describe_counter!(
        "biosync_snapshots_suppressed_total",
        "Fast ticks that produced no snapshot, by reason"
    );
    describe_counter!(
        "biosync_snapshots_dropped_total",
        "Snapshots rejected by the outbox, by reason"
    );
    describe_counter!(
        "biosync_metric_failures_total",
        "Derived metric computations that failed, by metric and reason"
    );
    describe_counter!(
        "biosync_sink_writes_total",
        "Sink write attempts, by sink and status"
    );
    describe_histogram!(
        "biosync_processing_duration_seconds",
        Unit::Seconds,
        "Time spent computing derived metrics per slow tick"
    );
    describe_histogram!(
        "biosync_sink_write_duration_seconds",
        Unit::Seconds,
        "Time spent in a single sink write"
    );
    describe_gauge!(
        "biosync_window_fill",
        Unit::Count,
        "Samples currently held per sliding window"
    );
    describe_gauge!(
        "biosync_spo2_percent",
        Unit::Percent,
        "Last computed blood oxygen saturation"
    );
    describe_gauge!(
        "biosync_respiration_rate_bpm",
        "Last computed respiration rate in breaths per minute"
    );
    describe_gauge!("biosync_heart_rate_bpm", "Last received heart rate");
}

/// 快照指标聚合器
///
/// 在内存中聚合已发出的快照，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SnapshotStatsAggregator {
    /// 总快照数
    pub total_snapshots: u64,

    /// 携带 SpO2 的快照数
    pub snapshots_with_spo2: u64,

    /// 携带呼吸率的快照数
    pub snapshots_with_respiration: u64,

    /// 心率统计 (bpm)
    pub heart_rate: RunningStats,

    /// SpO2 统计 (%)
    pub spo2: RunningStats,

    /// 呼吸率统计 (次/分)
    pub respiration: RunningStats,

    first_timestamp: Option<i64>,
    last_timestamp: Option<i64>,
}

impl SnapshotStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, snapshot: &OutgoingSnapshot) {
        self.total_snapshots += 1;
        self.heart_rate.push(f64::from(snapshot.hr));

        if let Some(spo2) = snapshot.spo2 {
            self.snapshots_with_spo2 += 1;
            self.spo2.push(f64::from(spo2));
        }
        if let Some(rate) = snapshot.respiration_rate {
            self.snapshots_with_respiration += 1;
            self.respiration.push(rate);
        }

        self.first_timestamp.get_or_insert(snapshot.timestamp);
        self.last_timestamp = Some(snapshot.timestamp);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let span_ms = match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => (last - first).max(0),
            _ => 0,
        };

        MetricsSummary {
            total_snapshots: self.total_snapshots,
            spo2_coverage: percent(self.snapshots_with_spo2, self.total_snapshots),
            respiration_coverage: percent(self.snapshots_with_respiration, self.total_snapshots),
            span_ms,
            heart_rate: StatsSummary::from(&self.heart_rate),
            spo2: StatsSummary::from(&self.spo2),
            respiration: StatsSummary::from(&self.respiration),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_snapshots: u64,
    pub spo2_coverage: f64,
    pub respiration_coverage: f64,
    /// 首末快照时间戳之差
    pub span_ms: i64,
    pub heart_rate: StatsSummary,
    pub spo2: StatsSummary,
    pub respiration: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Snapshot Summary ===")?;
        writeln!(f, "Total snapshots: {}", self.total_snapshots)?;
        writeln!(f, "Span: {:.1}s", self.span_ms as f64 / 1000.0)?;
        writeln!(f, "Heart rate (bpm): {}", self.heart_rate)?;
        writeln!(
            f,
            "SpO2 (%): {} [present {:.2}%]",
            self.spo2, self.spo2_coverage
        )?;
        writeln!(
            f,
            "Respiration (br/min): {} [present {:.2}%]",
            self.respiration, self.respiration_coverage
        )?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.2}, max={:.2}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(timestamp: i64, hr: i32, spo2: Option<f32>) -> OutgoingSnapshot {
        OutgoingSnapshot {
            timestamp,
            acc_x: 0,
            acc_y: 0,
            acc_z: 1000,
            ppg_green: 0,
            ppg_ir: 0,
            ppg_red: 0,
            hr,
            ibi: None,
            skin_temp: 33.5,
            eda: 0.8,
            ecg: 0.0,
            spo2,
            bvp: None,
            respiration_rate: None,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = SnapshotStatsAggregator::new();
        aggregator.update(&snapshot(1_000, 70, Some(97.0)));
        aggregator.update(&snapshot(2_000, 80, None));

        assert_eq!(aggregator.total_snapshots, 2);
        assert_eq!(aggregator.snapshots_with_spo2, 1);
        assert_eq!(aggregator.snapshots_with_respiration, 0);

        let summary = aggregator.summary();
        assert_eq!(summary.span_ms, 1_000);
        assert!((summary.heart_rate.mean - 75.0).abs() < 1e-10);
        assert!((summary.spo2_coverage - 50.0).abs() < 1e-10);
        assert_eq!(summary.respiration.count, 0);

        aggregator.reset();
        assert_eq!(aggregator.summary().total_snapshots, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SnapshotStatsAggregator::new();
        for i in 0..4 {
            aggregator.update(&snapshot(i * 1_000, 72, Some(98.0)));
        }

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total snapshots: 4"));
        assert!(output.contains("Span: 3.0s"));
        assert!(output.contains("present 100.00%"));
        assert!(output.contains("Respiration (br/min): N/A"));
    }
}
