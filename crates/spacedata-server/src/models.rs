//! Request, response and domain models for SpaceData.

pub mod analysis;
pub mod area;
pub mod chat;
pub mod scene;

pub use analysis::{LandCover, LandCoverChange, LandCoverEstimate};
pub use area::{search_bbox, AreaSelection, BoundingBox, LatLng, Polygon, DEFAULT_BBOX};
pub use chat::{ChatRole, ChatTurn};
pub use scene::SearchResult;
