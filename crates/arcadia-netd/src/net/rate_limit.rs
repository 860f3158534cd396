//! Rate limiting for accepted connections and inbound envelopes.
//!
//! Connection attempts are limited per source IP before the WebSocket
//! handshake; envelopes are limited per connection.

use std::net::IpAddr;
use std::num::NonZeroU32;

use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Type alias for a simple rate limiter (not keyed).
pub type SimpleRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Rate limiting configuration. A rate of 0 disables that limit.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Max new connections per IP per second.
    pub conn_per_ip_per_sec: u32,
    /// Max envelopes per connection per second.
    pub msg_per_conn_per_sec: u32,
    /// How many seconds' worth of traffic may arrive in one burst.
    pub burst_multiplier: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            conn_per_ip_per_sec: 10,
            msg_per_conn_per_sec: 60,
            burst_multiplier: 3,
        }
    }
}

impl RateLimitConfig {
    /// Limits off; used by tests and local development.
    pub fn disabled() -> Self {
        Self {
            conn_per_ip_per_sec: 0,
            msg_per_conn_per_sec: 0,
            burst_multiplier: 1,
        }
    }

    fn quota(&self, per_sec: u32) -> Option<Quota> {
        let rate = NonZeroU32::new(per_sec)?;
        let burst = NonZeroU32::new(per_sec.saturating_mul(self.burst_multiplier.max(1)))?;
        Some(Quota::per_second(rate).allow_burst(burst))
    }
}

/// Connection rate limiter keyed by peer IP.
pub struct IpRateLimiter {
    limiters: DashMap<IpAddr, SimpleRateLimiter>,
    quota: Option<Quota>,
}

impl IpRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limiters: DashMap::new(),
            quota: config.quota(config.conn_per_ip_per_sec),
        }
    }

    /// Returns `true` if a connection from `ip` is allowed.
    pub fn check(&self, ip: IpAddr) -> bool {
        let Some(quota) = self.quota else {
            return true;
        };
        self.limiters
            .entry(ip)
            .or_insert_with(|| RateLimiter::direct(quota))
            .check()
            .is_ok()
    }

    /// Drop entries once more than `max_entries` IPs are tracked.
    pub fn cleanup_stale(&self, max_entries: usize) {
        let excess = self.limiters.len().saturating_sub(max_entries);
        if excess == 0 {
            return;
        }
        let keys: Vec<IpAddr> = self
            .limiters
            .iter()
            .take(excess)
            .map(|e| *e.key())
            .collect();
        for key in keys {
            self.limiters.remove(&key);
        }
    }

    pub fn tracked(&self) -> usize {
        self.limiters.len()
    }
}

/// Envelope rate limiter owned by one connection task.
pub struct ConnRateLimiter {
    limiter: SimpleRateLimiter,
}

impl ConnRateLimiter {
    /// Returns `None` when message rate limiting is disabled.
    pub fn new(config: &RateLimitConfig) -> Option<Self> {
        let quota = config.quota(config.msg_per_conn_per_sec)?;
        Some(Self {
            limiter: RateLimiter::direct(quota),
        })
    }

    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn ip_limiter_allows_burst_then_rejects() {
        let limiter = IpRateLimiter::new(&RateLimitConfig {
            conn_per_ip_per_sec: 2,
            msg_per_conn_per_sec: 0,
            burst_multiplier: 2,
        });
        for _ in 0..4 {
            assert!(limiter.check(LOCALHOST));
        }
        assert!(!limiter.check(LOCALHOST));
        assert!(limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
    }

    #[test]
    fn cleanup_bounds_tracked_ips() {
        let limiter = IpRateLimiter::new(&RateLimitConfig::default());
        for i in 0..10u8 {
            limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)));
        }
        limiter.cleanup_stale(4);
        assert_eq!(limiter.tracked(), 4);
    }

    #[test]
    fn conn_limiter_respects_burst() {
        let limiter = ConnRateLimiter::new(&RateLimitConfig {
            conn_per_ip_per_sec: 0,
            msg_per_conn_per_sec: 3,
            burst_multiplier: 1,
        })
        .unwrap();
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }

    #[test]
    fn zero_rate_disables_limits() {
        let config = RateLimitConfig::disabled();
        let ip_limiter = IpRateLimiter::new(&config);
        for _ in 0..1000 {
            assert!(ip_limiter.check(LOCALHOST));
        }
        assert_eq!(ip_limiter.tracked(), 0);
        assert!(ConnRateLimiter::new(&config).is_none());
    }
}
