//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core_state::CoreState;
use crate::models::Identity;

/// Requests allowed per client address per window.
pub const RATE_LIMIT_REQUESTS: u32 = 100;
/// 15 minutes.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific caches.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self::with_rate_limiter(core, RateLimiter::new(RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW))
    }

    pub fn with_rate_limiter(core: Arc<CoreState>, limiter: RateLimiter) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(limiter)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Auth context: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated caller, injected into request extensions by the auth
/// middleware after the bearer token resolved to a live session.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
    /// Hash of the presented token, so logout can revoke exactly it.
    pub token_hash: String,
}

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> axum::Json<Self> {
        axum::Json(Self {
            success: true,
            data,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client sliding-window rate limiter.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            max_requests,
            window,
        }
    }

    /// Check if a client is within limits and record the request.
    /// Returns `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        let now = Instant::now();

        // Periodic cleanup when the map grows large
        if self.windows.len() > 10_000 {
            let window = self.window;
            self.windows
                .retain(|_, hits| hits.last().is_some_and(|t| now.duration_since(*t) < window));
        }

        let hits = self.windows.entry(client.to_string()).or_default();
        hits.retain(|ts| now.duration_since(*ts) < self.window);

        if hits.len() as u32 >= self.max_requests {
            let oldest = hits.first().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after.as_secs().max(1));
        }

        hits.push(now);
        Ok(())
    }
}
