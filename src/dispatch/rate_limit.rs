/// Rolling-window rate limiter shared by every dispatch

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Requests counted in the current window
#[derive(Debug, Clone, Copy)]
pub struct RateLimitWindow {
    pub request_count: u32,
    pub window_started_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<RateLimitWindow>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_duration: Duration) -> Self {
        Self {
            window: Mutex::new(RateLimitWindow {
                request_count: 0,
                window_started_at: Instant::now(),
            }),
            max_requests,
            window_duration,
        }
    }

    /// Lock the window, resetting it first if it has expired
    fn current(&self) -> MutexGuard<'_, RateLimitWindow> {
        let mut window = self.window.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Rate limiter lock poisoned, recovering data");
            poisoned.into_inner()
        });
        let now = Instant::now();
        if now.duration_since(window.window_started_at) >= self.window_duration {
            window.request_count = 0;
            window.window_started_at = now;
        }
        window
    }

    /// Whether a dispatch would currently be admitted
    pub fn can_dispatch(&self) -> bool {
        self.current().request_count < self.max_requests
    }

    /// Reserve one request in the current window
    ///
    /// Returns the time until the window resets when the cap is reached.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut window = self.current();
        if window.request_count >= self.max_requests {
            let elapsed = window.window_started_at.elapsed();
            return Err(self.window_duration.saturating_sub(elapsed));
        }
        window.request_count += 1;
        Ok(())
    }

    /// Requests left in the current window
    pub fn remaining(&self) -> u32 {
        self.max_requests.saturating_sub(self.current().request_count)
    }

    /// Requests counted in the current window
    pub fn used(&self) -> u32 {
        self.current().request_count
    }

    pub fn reset(&self) {
        let mut window = self.current();
        window.request_count = 0;
        window.window_started_at = Instant::now();
    }
}
