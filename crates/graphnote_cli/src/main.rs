//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `graphnote_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("graphnote_core version={}", graphnote_core::core_version());
    println!(
        "graphnote_core render={}",
        graphnote_core::render("**smoke** check")
    );
}
