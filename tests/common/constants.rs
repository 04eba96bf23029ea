//! Test constants shared across integration tests.

pub const BASE_URL: &str = "https://jobs.example.test/";
pub const PROFILE: &str = "Backend engineer, eight years of Rust and Go, looking for remote roles.";
pub const RESUME: &str = "Jane Doe\nSenior Software Engineer\nRust, PostgreSQL, Kubernetes";

/// URL of the n-th (1-based) results page.
pub fn results_url(page: usize) -> String {
    format!("{}jobs?page={}", BASE_URL, page)
}
