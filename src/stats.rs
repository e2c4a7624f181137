//! Intersection counters for the hot paths.
//!
//! Compiled out entirely unless the `stats` feature is enabled, so the
//! triangle and box loops stay branch-free in normal builds.

#[cfg(feature = "stats")]
pub use enabled::*;

#[cfg(not(feature = "stats"))]
pub use disabled::*;

#[cfg(feature = "stats")]
mod enabled {
    use std::sync::atomic::{AtomicU64, Ordering};

    pub static RAY_TRIANGLE_TESTS: AtomicU64 = AtomicU64::new(0);
    pub static ACCEL_BOX_TESTS: AtomicU64 = AtomicU64::new(0);
    pub static RAYS_CAST: AtomicU64 = AtomicU64::new(0);

    #[inline]
    pub fn count_triangle_test() {
        RAY_TRIANGLE_TESTS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_box_test() {
        ACCEL_BOX_TESTS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_ray_cast() {
        RAYS_CAST.fetch_add(1, Ordering::Relaxed);
    }

    /// Log the collected totals.
    pub fn report() {
        let triangle_tests = RAY_TRIANGLE_TESTS.load(Ordering::Relaxed);
        let box_tests = ACCEL_BOX_TESTS.load(Ordering::Relaxed);
        tracing::info!(
            ray_triangle_tests = triangle_tests,
            accel_box_tests = box_tests,
            total_intersection_tests = triangle_tests + box_tests,
            rays_cast = RAYS_CAST.load(Ordering::Relaxed),
            "render statistics"
        );
    }
}

#[cfg(not(feature = "stats"))]
mod disabled {
    #[inline(always)]
    pub fn count_triangle_test() {}

    #[inline(always)]
    pub fn count_box_test() {}

    #[inline(always)]
    pub fn count_ray_cast() {}

    pub fn report() {}
}
