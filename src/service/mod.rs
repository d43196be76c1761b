//! Port to the remote imagery platform.
//!
//! The pipeline only talks to the platform through [`ImageryService`]. Images are lazy
//! expressions evaluated on the service side, so aggregation never pulls rasters locally.

pub mod error;
pub mod image;
pub mod imagery;
pub mod retry;
pub mod session;
pub mod synthetic;

pub use error::{ServiceError, ServiceResult};
pub use image::{Image, ImageExpr};
pub use imagery::{CollectionQuery, ImageryService, Point, SampledPoint};
pub use retry::RetryPolicy;
pub use session::{ServiceSession, SessionState};
pub use synthetic::SyntheticService;
