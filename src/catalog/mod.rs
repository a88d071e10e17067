//! Music catalog boundary - talks to MusicBrainz and TheAudioDB.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - Internal types that represent our business logic
//! - **API DTOs** (`musicbrainz/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to domain models
//! - **Clients** - HTTP clients for external APIs
//! - **Traits** - Seams for dependency injection and test mocks
//!
//! This decoupling means:
//! 1. API changes don't ripple through our codebase
//! 2. We can test API contracts independently
//! 3. We can swap providers without changing business logic

pub mod audiodb;
pub mod domain;
pub mod musicbrainz;
pub mod traits;

pub use audiodb::AudioDbClient;
pub use domain::{
    ArtistHit, CatalogError, Medium, Release, ReleaseGroup, SessionTrack, Track, TrackListing,
};
pub use musicbrainz::MusicBrainzClient;
pub use traits::{ArtistImageApi, CatalogApi};
