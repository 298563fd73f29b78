//! 请求节奏控制 - 基础设施层

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// 节奏控制能力：在搜索词之间、同一搜索词的连续请求之间插入等待
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pace(&self, duration: Duration);
}

/// tokio 定时器 + 随机抖动
pub struct TokioPacer {
    jitter: Duration,
}

impl TokioPacer {
    pub fn new(jitter: Duration) -> Self {
        Self { jitter }
    }

    /// 不加抖动
    pub fn exact() -> Self {
        Self::new(Duration::ZERO)
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter.is_zero() {
            return base;
        }
        base + self.jitter.mul_f64(fastrand::f64())
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pace(&self, duration: Duration) {
        let wait = self.jittered(duration);
        if wait.is_zero() {
            return;
        }
        debug!("⏱️ 等待 {:.2} 秒", wait.as_secs_f64());
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_stays_in_range() {
        let pacer = TokioPacer::new(Duration::from_millis(500));
        for _ in 0..50 {
            let wait = pacer.jittered(Duration::from_secs(1));
            assert!(wait >= Duration::from_secs(1));
            assert!(wait <= Duration::from_millis(1500));
        }
    }

    #[tokio::test]
    async fn test_exact_pacer_sleeps_requested_duration() {
        let pacer = TokioPacer::exact();
        let start = tokio::time::Instant::now();
        pacer.pace(Duration::from_millis(30)).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
