/*!
 * # Gorzdrav appointment directory library
 *
 * A Rust library for the St. Petersburg `gorzdrav.spb.ru` appointment
 * directory: districts → institutions (LPU) → specialties → doctors →
 * appointment slots.
 *
 * ## Features
 *
 * - 🔗 **Deep links**: parse and build booking page links, including older
 *   hand-edited or partially decoded variants
 * - 🏷️ **Typed failures**: upstream error codes become a closed
 *   [`FailureCondition`](classify::FailureCondition) enum
 * - 🌐 **Directory client**: async lookups with retry, pacing and an
 *   in-flight limit (`client` feature, on by default)
 * - ⚙️ **Configuration**: defaults, TOML file and `GORZDRAV_*` environment
 *
 * ## Quick Start
 *
 * ```
 * use gorzdrav::prelude::*;
 *
 * # fn main() -> Result<()> {
 * let link = "https://gorzdrav.spb.ru/service-free-schedule#%5B%7B%22district%22:%225%22%7D,%7B%22lpu%22:%223%22%7D,%7B%22speciality%22:%2249351%22%7D,%7B%22schedule%22:%222229%22%7D,%7B%22doctor%22:%222229%22%7D%5D";
 *
 * let ids = parse(link)?;
 * assert_eq!(ids.lpu_id, Some(3));
 * assert_eq!(ids.doctor_id.as_deref(), Some("2229"));
 *
 * // Canonical form is stable
 * assert_eq!(generate(&ids)?, link);
 * # Ok(())
 * # }
 * ```
 *
 * ## Classifying Upstream Failures
 *
 * ```
 * use gorzdrav::prelude::*;
 *
 * match classify(39, None) {
 *     FailureCondition::NoTickets { message, .. } => {
 *         assert_eq!(message, "no appointment tickets available")
 *     }
 *     other => panic!("unexpected {}", other),
 * }
 * ```
 *
 * ## Directory Lookups
 *
 * ```no_run
 * # #[cfg(feature = "client")]
 * # async fn run() -> gorzdrav::Result<()> {
 * use gorzdrav::prelude::*;
 *
 * let client = DirectoryClient::with_config(GorzdravConfig::load())?;
 * for lpu in client.lpus(Some("5")).await? {
 *     let specialties = client.specialties(lpu.id).await?;
 *     println!("{}: {} specialties", lpu.display_name(), specialties.len());
 * }
 * # Ok(())
 * # }
 * ```
 */

// Re-export error types from root
pub use error::{GorzdravError, RequestContext, Result};

// Public modules
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod link;
pub mod models;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use gorzdrav::prelude::*;
/// ```
pub mod prelude {
    pub use crate::classify::{classify, FailureCondition};
    pub use crate::client::DirectoryClient;
    pub use crate::config::{ConfigBuilder, GorzdravConfig};
    pub use crate::error::{GorzdravError, Result};
    pub use crate::link::{generate, is_booking_link, parse, Identifiers};
    pub use crate::models::*;
}

/// Upstream constants
pub mod constants {
    pub use crate::classify::{
        CODE_NO_DOCTORS, CODE_NO_SPECIALTIES, CODE_NO_TICKETS, CODE_UPSTREAM_SYSTEM_ERROR,
        CODE_UPSTREAM_TIMEOUT,
    };
    pub use crate::link::{BOOKING_BASE_URL, BOOKING_HOST, BOOKING_PATH};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_roundtrip() {
        let ids = Identifiers::new(3, "49351").with_district("5").with_doctor("2229");
        let link = generate(&ids).unwrap();
        assert!(is_booking_link(&link));
        assert_eq!(parse(&link).unwrap(), ids);
    }

    #[test]
    fn test_constants() {
        assert_eq!(super::constants::CODE_NO_TICKETS, 39);
        assert!(super::constants::BOOKING_BASE_URL.starts_with("https://gorzdrav.spb.ru"));
    }
}
