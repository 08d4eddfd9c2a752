//! Address linking and scoring
//!
//! Street names, house numbers, postal codes, cities and countries are
//! detected as separate components. The linker groups nearby components
//! into composite addresses and the scorer rates each group.
//!
//! # Example
//!
//! ```rust
//! use vigil::detection::address::{AddressLinker, AddressScorer};
//! use vigil::detection::config::{AddressConfig, ReviewThresholds};
//! use vigil::domain::{DetectionSource, Entity, EntityType};
//!
//! let text = "Rue de Lausanne 12, 1000 Lausanne";
//! let spans = [
//!     (EntityType::StreetName, 0, 15),
//!     (EntityType::StreetNumber, 16, 18),
//!     (EntityType::PostalCode, 20, 24),
//!     (EntityType::City, 25, 33),
//! ];
//! let entities = spans
//!     .iter()
//!     .map(|(t, s, e)| Entity::from_span(text, *t, *s, *e, 0.8, DetectionSource::Pattern).unwrap())
//!     .collect();
//!
//! let linked = AddressLinker::new(&AddressConfig::default()).link(entities, text);
//! assert_eq!(linked.addresses.len(), 1);
//! assert!(linked.standalone.is_empty());
//!
//! let scorer = AddressScorer::new(&AddressConfig::default(), ReviewThresholds::default());
//! let address = scorer.score(linked.addresses.into_iter().next().unwrap());
//! assert!(address.auto_anonymize);
//! ```

pub mod gazetteer;
pub mod linker;
pub mod scorer;

pub use linker::{AddressLinker, LinkedEntities};
pub use scorer::AddressScorer;
