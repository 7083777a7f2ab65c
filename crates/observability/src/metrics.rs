//! 延迟派发指标收集模块
//!
//! 记录入队、派发、积压等运行指标，并在内存中聚合派发延迟统计。

use std::collections::HashMap;
use std::time::Duration;

use contracts::SessionId;
use metrics::{counter, gauge, histogram};

/// 记录一次成功入队
///
/// `pending` 为入队后的队列长度。
pub fn record_enqueued(pending: usize) {
    counter!("dispatchq_enqueued_total").increment(1);
    gauge!("dispatchq_pending").set(pending as f64);
}

/// 记录一次被忽略的入队调用
pub fn record_ignored(reason: &'static str) {
    counter!("dispatchq_ignored_total", "reason" => reason).increment(1);
}

/// 记录一次派发结果及其排队延迟
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_dispatch;
///
/// let latency = entry.age(now);
/// record_dispatch(session.send(message).is_ok(), latency);
/// ```
pub fn record_dispatch(success: bool, latency: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("dispatchq_dispatched_total", "status" => status).increment(1);
    histogram!("dispatchq_dispatch_latency_ms").record(latency.as_secs_f64() * 1000.0);
}

/// 记录当前积压深度
pub fn record_pending(pending: usize) {
    gauge!("dispatchq_pending").set(pending as f64);
}

/// 记录关停时被丢弃的条目数
pub fn record_discarded(count: usize) {
    if count > 0 {
        counter!("dispatchq_discarded_total").increment(count as u64);
    }
}

/// 派发延迟聚合器
///
/// 在内存中聚合延迟，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct LatencyAggregator {
    /// 延迟阈值 (毫秒)，用于检查延迟是否落在 [T, 2T) 区间
    pub threshold_ms: f64,

    /// 成功派发数
    pub total_dispatched: u64,

    /// 发送失败数
    pub total_failed: u64,

    /// 关停时丢弃数
    pub total_discarded: u64,

    /// 早于阈值派发的次数
    pub below_threshold: u64,

    /// 整体延迟统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 各 session 延迟统计 (毫秒)
    pub session_stats: HashMap<SessionId, RunningStats>,
}

impl LatencyAggregator {
    /// 创建新的聚合器
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold_ms: threshold.as_secs_f64() * 1000.0,
            ..Self::default()
        }
    }

    /// 记录一次成功派发
    pub fn record(&mut self, session: &SessionId, latency: Duration) {
        let ms = latency.as_secs_f64() * 1000.0;
        self.total_dispatched += 1;
        if ms < self.threshold_ms {
            self.below_threshold += 1;
        }
        self.latency_stats.push(ms);
        self.session_stats
            .entry(session.clone())
            .or_default()
            .push(ms);
    }

    /// 记录一次发送失败
    pub fn record_failure(&mut self) {
        self.total_failed += 1;
    }

    /// 记录丢弃条目
    pub fn record_discarded(&mut self, count: u64) {
        self.total_discarded += count;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> LatencySummary {
        let attempted = self.total_dispatched + self.total_failed;
        let mut sessions: Vec<(SessionId, StatsSummary)> = self
            .session_stats
            .iter()
            .map(|(id, stats)| (id.clone(), StatsSummary::from(stats)))
            .collect();
        sessions.sort_by(|a, b| a.0.cmp(&b.0));

        LatencySummary {
            threshold_ms: self.threshold_ms,
            total_dispatched: self.total_dispatched,
            total_failed: self.total_failed,
            total_discarded: self.total_discarded,
            below_threshold: self.below_threshold,
            failure_rate: if attempted > 0 {
                self.total_failed as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            sessions,
        }
    }

    /// 重置统计 (保留阈值)
    pub fn reset(&mut self) {
        *self = Self::new(Duration::from_secs_f64(self.threshold_ms / 1000.0));
    }
}

/// 延迟摘要
#[derive(Debug, Clone, Default)]
pub struct LatencySummary {
    pub threshold_ms: f64,
    pub total_dispatched: u64,
    pub total_failed: u64,
    pub total_discarded: u64,
    pub below_threshold: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    /// 按 session id 排序
    pub sessions: Vec<(SessionId, StatsSummary)>,
}

impl LatencySummary {
    /// 最大延迟是否低于两倍阈值
    pub fn within_bound(&self) -> bool {
        self.latency_ms.count == 0 || self.latency_ms.max < self.threshold_ms * 2.0
    }
}

impl std::fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Latency Summary ===")?;
        writeln!(f, "Delay threshold: {:.0} ms", self.threshold_ms)?;
        writeln!(f, "Dispatched: {}", self.total_dispatched)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Discarded: {}", self.total_discarded)?;
        writeln!(f, "Below threshold: {}", self.below_threshold)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.sessions.is_empty() {
            writeln!(f, "Per session:")?;
            for (session, stats) in &self.sessions {
                writeln!(f, "  {}: {}", session, stats)?;
            }
        }

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
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
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
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
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
