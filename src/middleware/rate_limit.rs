use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::{Error, Result};

const WINDOW: Duration = Duration::from_secs(1);

/// Request budget of one router surface, counted per one-second window.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    limit: u32,
    budget: Arc<Mutex<Budget>>,
}

#[derive(Debug)]
struct Budget {
    opened_at: Instant,
    spent: u32,
}

impl Budget {
    fn spend(&mut self, now: Instant, limit: u32) -> bool {
        if now.saturating_duration_since(self.opened_at) >= WINDOW {
            self.opened_at = now;
            self.spent = 0;
        }
        if self.spent >= limit {
            return false;
        }
        self.spent += 1;
        true
    }
}

impl RateLimiter {
    /// A limit of zero is raised to one so a surface is never closed outright.
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            budget: Arc::new(Mutex::new(Budget {
                opened_at: Instant::now(),
                spent: 0,
            })),
        }
    }

    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        self.budget
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .spend(now, self.limit)
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response> {
    if !limiter.allow() {
        tracing::warn!(path = %req.uri().path(), limit = limiter.limit, "Rate limit exceeded");
        return Err(Error::ResourceExhausted(
            "Too many requests, retry shortly.".to_string(),
        ));
    }
    Ok(next.run(req).await)
}
