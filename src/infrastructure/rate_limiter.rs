//! 共享限速器 - 基础设施层
//!
//! 外部题源的频率限制是全局的，所以整个进程共享一个令牌桶：
//! 请求路径和回填路径都通过它排队，保证总调用速率不超过题源限制。
//!
//! 测试中注入零间隔限速器即可让计时行为可控，不需要真实睡眠。

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// 令牌桶限速器
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_every: Duration,
    state: Mutex<BucketState>,
}

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// 创建令牌桶
    ///
    /// # 参数
    /// - `capacity`: 桶容量（允许的突发调用数）
    /// - `refill_every`: 每隔多久补充一个令牌
    pub fn new(capacity: u32, refill_every: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            refill_every,
            state: Mutex::new(BucketState {
                tokens: capacity.max(1),
                last_refill: Instant::now(),
            }),
        }
    }

    /// 创建固定间隔限速器（容量 1，相邻调用至少间隔 `interval_ms` 毫秒）
    ///
    /// 对应回填调度器的固定延迟需求
    pub fn fixed_interval(interval_ms: u64) -> Self {
        Self::new(1, Duration::from_millis(interval_ms))
    }

    /// 创建不限速的限速器（测试用）
    pub fn unlimited() -> Self {
        Self::new(u32::MAX, Duration::ZERO)
    }

    /// 获取一个令牌，必要时等待
    pub async fn acquire(&self) {
        loop {
            let mut state = self.state.lock().await;

            if self.refill_every.is_zero() {
                return;
            }

            let elapsed = state.last_refill.elapsed();
            if elapsed >= self.refill_every {
                let refills = (elapsed.as_millis() / self.refill_every.as_millis().max(1)) as u32;
                state.tokens = state.tokens.saturating_add(refills).min(self.capacity);
                state.last_refill = Instant::now();
            }

            if state.tokens > 0 {
                state.tokens -= 1;
                return;
            }

            let sleep_for = self.refill_every;
            drop(state);
            tokio::time::sleep(sleep_for).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unlimited_never_blocks() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_burst_within_capacity_never_blocks() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_spaces_calls() {
        let limiter = RateLimiter::fixed_interval(1000);
        limiter.acquire().await;

        let before = tokio::time::Instant::now();
        limiter.acquire().await;
        // 暂停时钟下 sleep 自动推进，等待时长应不少于一个间隔
        assert!(before.elapsed() >= Duration::from_millis(1000));
    }
}
